//! Telegram Bot API transport
//!
//! Outbound replies go through `sendMessage`. Inbound messages arrive either
//! as webhook `Update`s (see the server module) or through `getUpdates` long
//! polling with offset tracking.

use crate::bot::CommandHandler;
use crate::config::TelegramConfig;
use crate::error::{BotError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Telegram caps a single message at 4096 characters
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Outbound side of a chat
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// Envelope every Bot API method answers with
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

impl<T> ApiResponse<T> {
    fn into_result(self, method: &str) -> Result<T> {
        match (self.ok, self.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(BotError::Telegram(format!(
                "{} failed: {}",
                method,
                self.description.unwrap_or_else(|| "no description".to_string())
            ))),
        }
    }
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'a str>,
}

pub struct TelegramClient {
    http: Client,
    api_base: String,
    bot_token: String,
    parse_mode: Option<String>,
    poll_timeout_secs: u64,
    last_update_id: RwLock<i64>,
}

impl TelegramClient {
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        if config.bot_token.trim().is_empty() {
            return Err(BotError::NotConfigured("telegram.bot_token"));
        }

        // The HTTP timeout must outlast a long poll
        let http = Client::builder()
            .timeout(Duration::from_secs(config.poll_timeout_secs + 15))
            .build()?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
            parse_mode: config.parse_mode.clone().filter(|m| !m.is_empty()),
            poll_timeout_secs: config.poll_timeout_secs,
            last_update_id: RwLock::new(0),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.bot_token, method)
    }

    async fn send_chunk(&self, chat_id: i64, text: &str) -> Result<()> {
        let request = SendMessageRequest {
            chat_id,
            text,
            parse_mode: self.parse_mode.as_deref(),
        };

        let resp: ApiResponse<serde_json::Value> = self
            .http
            .post(self.method_url("sendMessage"))
            .json(&request)
            .send()
            .await?
            .json()
            .await?;
        resp.into_result("sendMessage").map(|_| ())
    }

    /// Next batch of updates after the last acknowledged one
    pub async fn get_updates(&self) -> Result<Vec<Update>> {
        let offset = *self.last_update_id.read().await;
        let timeout = self.poll_timeout_secs.to_string();
        let offset_param = offset.to_string();

        let resp: ApiResponse<Vec<Update>> = self
            .http
            .get(self.method_url("getUpdates"))
            .query(&[
                ("offset", offset_param.as_str()),
                ("timeout", timeout.as_str()),
                ("allowed_updates", "[\"message\"]"),
            ])
            .send()
            .await?
            .json()
            .await?;
        let updates = resp.into_result("getUpdates")?;

        if let Some(last) = updates.iter().map(|u| u.update_id).max() {
            let mut last_id = self.last_update_id.write().await;
            *last_id = last + 1;
        }
        Ok(updates)
    }

    /// Polling and webhooks are exclusive on Telegram's side
    pub async fn delete_webhook(&self) -> Result<()> {
        let resp: ApiResponse<bool> = self
            .http
            .post(self.method_url("deleteWebhook"))
            .send()
            .await?
            .json()
            .await?;
        resp.into_result("deleteWebhook").map(|_| ())
    }

    /// Long-poll forever, handing each update to the command handler
    pub async fn run_polling(self: Arc<Self>, handler: Arc<CommandHandler>) {
        tracing::info!("Starting Telegram long polling...");
        if let Err(e) = self.delete_webhook().await {
            tracing::warn!("Could not clear webhook before polling: {}", e);
        }

        loop {
            match self.get_updates().await {
                Ok(updates) => {
                    for update in updates {
                        let id = update.update_id;
                        if let Err(e) = handler.handle_update(update).await {
                            tracing::error!("Failed to handle update {}: {}", id, e);
                        }
                    }
                }
                Err(e) => {
                    tracing::error!("Failed to poll Telegram updates: {}", e);
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
        }
    }
}

#[async_trait]
impl ChatTransport for TelegramClient {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        for chunk in split_message(text, MAX_MESSAGE_CHARS) {
            self.send_chunk(chat_id, &chunk).await?;
        }
        tracing::debug!("Replied to chat {} ({} chars)", chat_id, text.chars().count());
        Ok(())
    }
}

/// Split on line boundaries into chunks of at most `max` characters.
/// A single line longer than `max` is hard-split.
pub fn split_message(text: &str, max: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();
        if current_len + line_len > max && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if line_len > max {
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(max) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }
        current.push_str(line);
        current_len += line_len;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    if chunks.is_empty() {
        chunks.push(String::new());
    }
    chunks
}
