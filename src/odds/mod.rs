//! Odds source, cache and slate selection

pub mod cache;
pub mod client;

#[cfg(test)]
mod tests;

pub use cache::OddsCache;
pub use client::OddsApiClient;

use crate::config::OddsConfig;
use crate::economics::{rank_games, RankedGame, SharpWeights};
use crate::error::Result;
use crate::types::GameRecord;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Anything that can list games with odds for a sport key
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OddsSource: Send + Sync {
    async fn fetch_games(&self, sport: &str) -> Result<Vec<GameRecord>>;
}

/// Cached odds lookups with sport fallback and sharp-score ranking
pub struct OddsService {
    source: Arc<dyn OddsSource>,
    cache: OddsCache,
    sports: Vec<String>,
    weights: SharpWeights,
}

impl OddsService {
    pub fn new(source: Arc<dyn OddsSource>, config: &OddsConfig, weights: SharpWeights) -> Self {
        Self {
            source,
            cache: OddsCache::new(Duration::from_secs(config.cache_ttl_secs)),
            sports: config.sports.clone(),
            weights,
        }
    }

    /// Games for one sport, served from cache while fresh
    pub async fn slate(&self, sport: &str) -> Result<Arc<Vec<GameRecord>>> {
        let source = self.source.clone();
        let key = sport.to_string();
        self.cache
            .get_or_fetch(sport, move || async move { source.fetch_games(&key).await })
            .await
    }

    /// First configured sport that currently has games
    pub async fn first_available(&self) -> Option<(String, Arc<Vec<GameRecord>>)> {
        for sport in &self.sports {
            match self.slate(sport).await {
                Ok(games) if !games.is_empty() => return Some((sport.clone(), games)),
                Ok(_) => tracing::debug!("No games listed for {}", sport),
                Err(e) => tracing::warn!("Odds fetch failed for {}: {}", sport, e),
            }
        }
        None
    }

    /// Games ranked by sharp score. An explicit sport skips the fallback chain.
    /// Empty when nothing could be fetched.
    pub async fn ranked(&self, sport: Option<&str>) -> Vec<RankedGame> {
        let games = match sport {
            Some(s) => match self.slate(s).await {
                Ok(games) => games,
                Err(e) => {
                    tracing::warn!("Odds fetch failed for {}: {}", s, e);
                    return Vec::new();
                }
            },
            None => match self.first_available().await {
                Some((_, games)) => games,
                None => return Vec::new(),
            },
        };
        rank_games(games.to_vec(), &self.weights)
    }

    pub fn weights(&self) -> &SharpWeights {
        &self.weights
    }
}
