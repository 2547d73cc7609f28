//! Tests for odds conversion and slate selection

#[cfg(test)]
mod tests {
    use super::super::client::{convert_games, ApiGame};
    use super::super::*;
    use crate::config::OddsConfig;
    use crate::error::BotError;
    use crate::types::{BookQuotes, MarketKind, OddsQuote};
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const SAMPLE: &str = r#"[
      {
        "id": "abc123",
        "sport_key": "americanfootball_nfl",
        "commence_time": "2025-11-16T18:00:00Z",
        "home_team": "Chicago Bears",
        "away_team": "Green Bay Packers",
        "bookmakers": [
          {
            "key": "draftkings",
            "title": "DraftKings",
            "markets": [
              {"key": "h2h", "outcomes": [
                {"name": "Chicago Bears", "price": 2.10},
                {"name": "Green Bay Packers", "price": 1.75}
              ]},
              {"key": "spreads", "outcomes": [
                {"name": "Chicago Bears", "price": 1.91, "point": 3.5},
                {"name": "Green Bay Packers", "price": 1.91, "point": -3.5}
              ]},
              {"key": "totals", "outcomes": [
                {"name": "Over", "price": 1.87, "point": 44.5},
                {"name": "Under", "price": 1.95, "point": 44.5}
              ]},
              {"key": "player_pass_yds", "outcomes": [
                {"name": "Over", "description": "Jordan Love", "price": 1.83, "point": 235.5}
              ]},
              {"key": "outrights", "outcomes": [
                {"name": "Chicago Bears", "price": 40.0}
              ]}
            ]
          },
          {
            "key": "fanduel",
            "title": "FanDuel",
            "markets": [
              {"key": "spreads", "outcomes": [
                {"name": "Chicago Bears", "price": 1.90},
                {"name": "Green Bay Packers", "price": 1.0, "point": -3.0}
              ]}
            ]
          }
        ]
      },
      {
        "id": "bad-date",
        "commence_time": "soon",
        "home_team": "A",
        "away_team": "B",
        "bookmakers": []
      },
      {
        "id": "no-books",
        "commence_time": "2025-11-16T21:25:00Z",
        "home_team": "Dallas Cowboys",
        "away_team": "Las Vegas Raiders"
      }
    ]"#;

    fn sample_games() -> Vec<crate::types::GameRecord> {
        let raw: Vec<ApiGame> = serde_json::from_str(SAMPLE).unwrap();
        convert_games("americanfootball_nfl", raw)
    }

    #[test]
    fn test_convert_skips_bad_dates() {
        let games = sample_games();
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].id, "abc123");
        assert_eq!(games[1].id, "no-books");
    }

    #[test]
    fn test_convert_markets() {
        let games = sample_games();
        let game = &games[0];
        assert_eq!(game.home, "Chicago Bears");
        assert_eq!(game.books.len(), 2);

        let dk = &game.books[0];
        assert_eq!(dk.book, "draftkings");
        // 2 h2h + 2 spreads + 2 totals + 1 prop, outrights ignored
        assert_eq!(dk.quotes.len(), 7);

        assert_eq!(game.spread_for("Chicago Bears"), Some(3.5));
        assert_eq!(game.total_line(), Some(44.5));
        assert_eq!(game.moneyline_for("Chicago Bears"), Some(2.10));

        let prop = dk
            .quotes
            .iter()
            .find(|q| q.market == MarketKind::PlayerProp)
            .unwrap();
        assert_eq!(prop.subject, "Jordan Love");
        assert_eq!(prop.side.as_deref(), Some("Over"));
        assert_eq!(prop.line, Some(235.5));
    }

    #[test]
    fn test_convert_drops_malformed_outcomes() {
        let games = sample_games();
        // fanduel: one spread without a point, one with price 1.0
        assert!(games[0].books[1].quotes.is_empty());
    }

    #[test]
    fn test_convert_game_without_books() {
        let games = sample_games();
        assert!(!games[1].has_odds());
        assert_eq!(games[1].sport, "americanfootball_nfl");
    }

    fn game(id: &str, line: f64) -> crate::types::GameRecord {
        let q = |book: &str, line: f64| OddsQuote {
            book: book.to_string(),
            market: MarketKind::Spread,
            subject: "Home".to_string(),
            side: None,
            line: Some(line),
            price: 1.91,
        };
        crate::types::GameRecord {
            id: id.to_string(),
            sport: "americanfootball_nfl".to_string(),
            home: "Home".to_string(),
            away: "Away".to_string(),
            start: Utc::now(),
            books: vec![
                BookQuotes { book: "dk".to_string(), quotes: vec![q("dk", line)] },
                BookQuotes { book: "fd".to_string(), quotes: vec![q("fd", line)] },
            ],
        }
    }

    fn service(mock: MockOddsSource) -> OddsService {
        OddsService::new(
            std::sync::Arc::new(mock),
            &OddsConfig::default(),
            crate::economics::SharpWeights::default(),
        )
    }

    #[tokio::test]
    async fn test_fallback_to_next_sport() {
        let mut mock = MockOddsSource::new();
        mock.expect_fetch_games()
            .withf(|sport: &str| sport == "americanfootball_ncaaf")
            .times(1)
            .returning(|_| Ok(Vec::new()));
        mock.expect_fetch_games()
            .withf(|sport: &str| sport == "americanfootball_nfl")
            .times(1)
            .returning(|_| Ok(vec![game("nfl-1", -3.0)]));

        let svc = service(mock);
        let (sport, games) = svc.first_available().await.unwrap();
        assert_eq!(sport, "americanfootball_nfl");
        assert_eq!(games[0].id, "nfl-1");
    }

    #[tokio::test]
    async fn test_fallback_survives_errors() {
        let mut mock = MockOddsSource::new();
        mock.expect_fetch_games()
            .withf(|sport: &str| sport == "americanfootball_ncaaf")
            .returning(|_| Err(BotError::Api("Odds API 401".into())));
        mock.expect_fetch_games()
            .withf(|sport: &str| sport == "americanfootball_nfl")
            .returning(|_| Ok(vec![game("nfl-1", -3.0)]));

        let svc = service(mock);
        assert_eq!(svc.ranked(None).await.len(), 1);
    }

    #[tokio::test]
    async fn test_nothing_available() {
        let mut mock = MockOddsSource::new();
        mock.expect_fetch_games().returning(|_| Err(BotError::Api("down".into())));

        let svc = service(mock);
        assert!(svc.first_available().await.is_none());
        assert!(svc.ranked(None).await.is_empty());
    }

    #[tokio::test]
    async fn test_ranked_orders_closer_games_first() {
        let mut mock = MockOddsSource::new();
        mock.expect_fetch_games()
            .returning(|_| Ok(vec![game("blowout", -14.0), game("close", -1.0)]));

        let svc = service(mock);
        let ranked = svc.ranked(Some("americanfootball_nfl")).await;
        assert_eq!(ranked[0].game.id, "close");
        assert_eq!(ranked[1].game.id, "blowout");
    }

    #[tokio::test]
    async fn test_slate_is_cached() {
        let mut mock = MockOddsSource::new();
        mock.expect_fetch_games()
            .times(1)
            .returning(|_| Ok(vec![game("g", -3.0)]));

        let svc = service(mock);
        svc.slate("americanfootball_nfl").await.unwrap();
        svc.slate("americanfootball_nfl").await.unwrap();
    }

    // ==================== HTTP client ====================

    /// Local stand-in for the Odds API answering every request the same way
    async fn odds_server(
        status: reqwest::StatusCode,
        body: &'static str,
    ) -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let app = axum::Router::new().route(
            "/sports/{sport}/odds",
            axum::routing::get(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    (status, body)
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), hits)
    }

    fn api_client(base_url: String) -> OddsApiClient {
        OddsApiClient::new(OddsConfig {
            api_key: "test-key".to_string(),
            base_url,
            timeout_secs: 5,
            retry_attempts: 2,
            retry_backoff_ms: 1,
            ..OddsConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_client_parses_games() {
        let (url, hits) = odds_server(reqwest::StatusCode::OK, SAMPLE).await;
        let games = api_client(url).fetch_games("americanfootball_nfl").await.unwrap();
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].home, "Chicago Bears");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_client_retries_server_errors() {
        let (url, hits) = odds_server(reqwest::StatusCode::SERVICE_UNAVAILABLE, "busy").await;
        let err = api_client(url).fetch_games("americanfootball_nfl").await.unwrap_err();
        assert!(matches!(
            err,
            BotError::Status { status, .. } if status == reqwest::StatusCode::SERVICE_UNAVAILABLE
        ));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_client_does_not_retry_client_errors() {
        let (url, hits) = odds_server(reqwest::StatusCode::UNAUTHORIZED, "bad key").await;
        let err = api_client(url).fetch_games("americanfootball_nfl").await.unwrap_err();
        assert!(matches!(err, BotError::Status { .. }));
        assert!(err.to_string().contains("bad key"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_client_does_not_retry_bad_body() {
        let (url, hits) = odds_server(reqwest::StatusCode::OK, "<html>maintenance</html>").await;
        let err = api_client(url).fetch_games("americanfootball_nfl").await.unwrap_err();
        assert!(matches!(err, BotError::Http(ref e) if e.is_decode()));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_client_requires_key() {
        let client = OddsApiClient::new(OddsConfig::default()).unwrap();
        assert!(matches!(
            client.fetch_games("americanfootball_nfl").await,
            Err(BotError::NotConfigured("odds.api_key"))
        ));
    }
}
