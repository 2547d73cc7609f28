//! The Odds API client
//!
//! Fetches `/sports/{sport}/odds` in decimal format and converts the nested
//! bookmaker → market → outcome payload into [`GameRecord`]s.

use super::OddsSource;
use crate::config::OddsConfig;
use crate::error::{BotError, Result};
use crate::types::{BookQuotes, GameRecord, MarketKind, OddsQuote};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct OddsApiClient {
    http: Client,
    config: OddsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiGame {
    id: String,
    #[serde(default)]
    sport_key: String,
    commence_time: String,
    home_team: String,
    away_team: String,
    #[serde(default)]
    bookmakers: Vec<ApiBookmaker>,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiBookmaker {
    key: String,
    #[serde(default)]
    markets: Vec<ApiMarket>,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiMarket {
    key: String,
    #[serde(default)]
    outcomes: Vec<ApiOutcome>,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiOutcome {
    name: String,
    price: Option<f64>,
    point: Option<f64>,
    /// Player name on prop markets
    description: Option<String>,
}

impl OddsApiClient {
    pub fn new(config: OddsConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { http, config })
    }

    async fn fetch_once(&self, sport: &str) -> Result<Vec<ApiGame>> {
        let url = format!(
            "{}/sports/{}/odds",
            self.config.base_url.trim_end_matches('/'),
            sport
        );

        let resp = self
            .http
            .get(&url)
            .query(&[
                ("apiKey", self.config.api_key.as_str()),
                ("regions", self.config.regions.as_str()),
                ("markets", self.config.markets.as_str()),
                ("oddsFormat", "decimal"),
                ("dateFormat", "iso"),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BotError::Status {
                status,
                message: format!(
                    "Odds API {}: {}",
                    sport,
                    body.chars().take(200).collect::<String>()
                ),
            });
        }

        if let Some(remaining) = resp
            .headers()
            .get("x-requests-remaining")
            .and_then(|v| v.to_str().ok())
        {
            debug!("Odds API requests remaining: {}", remaining);
        }

        Ok(resp.json().await?)
    }
}

#[async_trait]
impl OddsSource for OddsApiClient {
    async fn fetch_games(&self, sport: &str) -> Result<Vec<GameRecord>> {
        if self.config.api_key.is_empty() {
            return Err(BotError::NotConfigured("odds.api_key"));
        }

        let attempts = self.config.retry_attempts + 1;
        let mut attempt = 1;
        loop {
            match self.fetch_once(sport).await {
                Ok(raw) => {
                    let games = convert_games(sport, raw);
                    info!("Fetched {} {} games with odds", games.len(), sport);
                    return Ok(games);
                }
                Err(e) if attempt < attempts && is_retryable(&e) => {
                    let delay = Duration::from_millis(self.config.retry_backoff_ms * attempt as u64);
                    warn!("Odds fetch attempt {}/{} failed: {} (retrying in {:?})", attempt, attempts, e, delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Only server errors and transport failures are retried. Client errors
/// (bad key, unknown sport, quota) and undecodable bodies will not fix
/// themselves.
fn is_retryable(err: &BotError) -> bool {
    match err {
        BotError::Http(e) if e.is_decode() => false,
        BotError::Http(e) => e.status().map(|s| s.is_server_error()).unwrap_or(true),
        BotError::Status { status, .. } => status.is_server_error(),
        _ => false,
    }
}

pub(crate) fn convert_games(sport: &str, raw: Vec<ApiGame>) -> Vec<GameRecord> {
    raw.into_iter()
        .filter_map(|g| {
            let start = match g.commence_time.parse::<DateTime<Utc>>() {
                Ok(t) => t,
                Err(e) => {
                    debug!("Skipping game {} with bad commence_time: {}", g.id, e);
                    return None;
                }
            };

            let books = g
                .bookmakers
                .into_iter()
                .map(|b| {
                    let book = b.key.as_str();
                    let quotes = b
                        .markets
                        .iter()
                        .filter_map(|m| MarketKind::from_api_key(&m.key).map(|kind| (kind, m)))
                        .flat_map(|(kind, m)| {
                            m.outcomes
                                .iter()
                                .filter_map(move |o| convert_outcome(book, kind, o))
                        })
                        .collect();
                    BookQuotes { book: b.key.clone(), quotes }
                })
                .collect();

            Some(GameRecord {
                id: g.id,
                sport: if g.sport_key.is_empty() {
                    sport.to_string()
                } else {
                    g.sport_key
                },
                home: g.home_team,
                away: g.away_team,
                start,
                books,
            })
        })
        .collect()
}

fn convert_outcome(book: &str, market: MarketKind, o: &ApiOutcome) -> Option<OddsQuote> {
    let price = o.price.filter(|p| p.is_finite() && *p > 1.0)?;
    let line = o.point.filter(|p| p.is_finite());

    let (subject, side) = match market {
        MarketKind::Moneyline => (o.name.clone(), None),
        MarketKind::Spread => {
            line?;
            (o.name.clone(), None)
        }
        MarketKind::Total => {
            line?;
            (o.name.clone(), Some(o.name.clone()))
        }
        MarketKind::PlayerProp => (
            o.description.clone().unwrap_or_else(|| o.name.clone()),
            Some(o.name.clone()),
        ),
    };

    Some(OddsQuote {
        book: book.to_string(),
        market,
        subject,
        side,
        line: if market == MarketKind::Moneyline { None } else { line },
        price,
    })
}
