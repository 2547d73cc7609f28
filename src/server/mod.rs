//! Webhook HTTP server
//!
//! `POST /webhook` receives Telegram updates and always answers
//! `{"ok": true}` so Telegram does not redeliver; handling failures are
//! logged instead. `GET /` is the health check hosting platforms poll.

use crate::bot::CommandHandler;
use crate::config::ServerConfig;
use crate::error::Result;
use crate::telegram::Update;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::sync::Arc;

pub const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

#[derive(Clone)]
pub struct ServerState {
    handler: Arc<CommandHandler>,
    secret_token: Option<String>,
}

impl ServerState {
    pub fn new(handler: Arc<CommandHandler>, secret_token: Option<String>) -> Self {
        Self {
            handler,
            secret_token: secret_token.filter(|s| !s.is_empty()),
        }
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        match &self.secret_token {
            Some(expected) => headers
                .get(SECRET_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(|got| got == expected)
                .unwrap_or(false),
            None => true,
        }
    }
}

async fn webhook(State(state): State<ServerState>, headers: HeaderMap, body: Bytes) -> Response {
    if !state.authorized(&headers) {
        tracing::warn!("Rejected webhook call with missing or wrong secret token");
        return (StatusCode::UNAUTHORIZED, Json(json!({"ok": false}))).into_response();
    }

    match serde_json::from_slice::<Update>(&body) {
        Ok(update) => {
            let id = update.update_id;
            if let Err(e) = state.handler.handle_update(update).await {
                tracing::error!("Failed to handle update {}: {}", id, e);
            }
        }
        Err(e) => tracing::warn!("Ignoring unparseable webhook body: {}", e),
    }

    Json(json!({"ok": true})).into_response()
}

async fn health_check() -> &'static str {
    "Bot alive 🤖"
}

pub fn create_router(state: ServerState) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/webhook", post(webhook))
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Serve until Ctrl-C
pub async fn start_server(handler: Arc<CommandHandler>, config: &ServerConfig) -> Result<()> {
    let app = create_router(ServerState::new(handler, config.secret_token.clone()));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Webhook server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::odds::{MockOddsSource, OddsService};
    use crate::store::MemoryStore;
    use crate::telegram::MockChatTransport;

    fn state(transport: MockChatTransport, secret: Option<&str>) -> ServerState {
        let config = Config::default();
        let mut odds = MockOddsSource::new();
        odds.expect_fetch_games().returning(|_| Ok(Vec::new()));
        let odds = Arc::new(OddsService::new(
            Arc::new(odds),
            &config.odds,
            config.economics.sharp.clone(),
        ));
        let handler = CommandHandler::new(
            &config,
            odds,
            None,
            Arc::new(MemoryStore::new(config.bankroll.clone())),
            Arc::new(transport),
        );
        ServerState::new(Arc::new(handler), secret.map(str::to_string))
    }

    const UPDATE: &str = r#"{"update_id": 1, "message": {"message_id": 2, "chat": {"id": 99}, "text": "help"}}"#;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        assert_eq!(health_check().await, "Bot alive 🤖");
    }

    #[tokio::test]
    async fn test_webhook_replies_to_chat() {
        let mut transport = MockChatTransport::new();
        transport
            .expect_send_message()
            .withf(|chat_id: &i64, text: &str| *chat_id == 99 && text.starts_with("👊 Send me:"))
            .times(1)
            .returning(|_, _| Ok(()));

        let resp = webhook(State(state(transport, None)), HeaderMap::new(), Bytes::from(UPDATE)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await, json!({"ok": true}));
    }

    #[tokio::test]
    async fn test_webhook_ok_when_send_fails() {
        let mut transport = MockChatTransport::new();
        transport
            .expect_send_message()
            .returning(|_, _| Err(crate::error::BotError::Telegram("blocked".into())));

        let resp = webhook(State(state(transport, None)), HeaderMap::new(), Bytes::from(UPDATE)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await, json!({"ok": true}));
    }

    #[tokio::test]
    async fn test_webhook_ignores_garbage_and_non_messages() {
        let mut transport = MockChatTransport::new();
        transport.expect_send_message().times(0);
        let state = state(transport, None);

        let resp = webhook(State(state.clone()), HeaderMap::new(), Bytes::from("not json")).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = webhook(State(state), HeaderMap::new(), Bytes::from(r#"{"update_id": 3}"#)).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_webhook_secret_token() {
        let mut transport = MockChatTransport::new();
        transport.expect_send_message().times(1).returning(|_, _| Ok(()));
        let state = state(transport, Some("s3cret"));

        let resp = webhook(State(state.clone()), HeaderMap::new(), Bytes::from(UPDATE)).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let mut wrong = HeaderMap::new();
        wrong.insert(SECRET_HEADER, "nope".parse().unwrap());
        let resp = webhook(State(state.clone()), wrong, Bytes::from(UPDATE)).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let mut right = HeaderMap::new();
        right.insert(SECRET_HEADER, "s3cret".parse().unwrap());
        let resp = webhook(State(state), right, Bytes::from(UPDATE)).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
