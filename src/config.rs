//! Configuration management
//!
//! Settings are layered: `config.toml` (optional), then `SHARPLINE_*`
//! environment variables (`__` separates sections), then the legacy
//! single-name variables (`TELEGRAM_TOKEN`, `ODDS_API_KEY`, `OPENAI_KEY`, `PORT`).

use crate::economics::{GradeLadder, SharpWeights};
use crate::error::{BotError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub odds: OddsConfig,
    pub llm: Option<LlmConfig>,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub economics: EconomicsConfig,
    #[serde(default)]
    pub bankroll: BankrollConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default = "default_telegram_api")]
    pub api_base: String,
    /// `Markdown`, `HTML` or unset for plain text
    pub parse_mode: Option<String>,
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_base: default_telegram_api(),
            parse_mode: None,
            poll_timeout_secs: default_poll_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OddsConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_odds_url")]
    pub base_url: String,
    /// Tried in order until one returns games
    #[serde(default = "default_sports")]
    pub sports: Vec<String>,
    #[serde(default = "default_regions")]
    pub regions: String,
    #[serde(default = "default_markets")]
    pub markets: String,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_odds_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_ms: u64,
    /// Games listed on the card
    #[serde(default = "default_card_size")]
    pub card_size: usize,
    /// Games summarized into AI prompts
    #[serde(default = "default_snippet_games")]
    pub snippet_games: usize,
}

impl Default for OddsConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_odds_url(),
            sports: default_sports(),
            regions: default_regions(),
            markets: default_markets(),
            cache_ttl_secs: default_cache_ttl(),
            timeout_secs: default_odds_timeout(),
            retry_attempts: default_retry_attempts(),
            retry_backoff_ms: default_retry_backoff(),
            card_size: default_card_size(),
            snippet_games: default_snippet_games(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    /// `openai`, `deepseek`, `ollama` or any OpenAI-compatible endpoint
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    #[serde(default)]
    pub api_key: String,
    pub model: Option<String>,
    pub base_url: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_parlay_max_tokens")]
    pub parlay_max_tokens: u32,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Expected `X-Telegram-Bot-Api-Secret-Token` header, if set
    pub secret_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            secret_token: None,
        }
    }
}

/// Tunable betting-math constants
#[derive(Debug, Clone, Deserialize)]
pub struct EconomicsConfig {
    #[serde(default)]
    pub sharp: SharpWeights,
    #[serde(default)]
    pub grades: GradeLadder,
    /// Fraction of full Kelly used for stake suggestions
    #[serde(default = "default_kelly_multiplier")]
    pub kelly_multiplier: f64,
}

impl Default for EconomicsConfig {
    fn default() -> Self {
        Self {
            sharp: SharpWeights::default(),
            grades: GradeLadder::default(),
            kelly_multiplier: default_kelly_multiplier(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BankrollConfig {
    /// JSON state file; in-memory only when unset
    pub state_path: Option<String>,
    #[serde(default = "default_starting_units")]
    pub starting_units: Decimal,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for BankrollConfig {
    fn default() -> Self {
        Self {
            state_path: None,
            starting_units: default_starting_units(),
            history_limit: default_history_limit(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Messages per chat per minute
    #[serde(default = "default_per_minute")]
    pub per_minute: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            per_minute: default_per_minute(),
        }
    }
}

fn default_telegram_api() -> String {
    "https://api.telegram.org".to_string()
}
fn default_poll_timeout() -> u64 {
    30
}
fn default_odds_url() -> String {
    "https://api.the-odds-api.com/v4".to_string()
}
fn default_sports() -> Vec<String> {
    vec![
        "americanfootball_ncaaf".to_string(),
        "americanfootball_nfl".to_string(),
    ]
}
fn default_regions() -> String {
    "us".to_string()
}
fn default_markets() -> String {
    "h2h,spreads,totals,player_pass_yds,player_rush_yds,player_recv_yds".to_string()
}
fn default_cache_ttl() -> u64 {
    300
}
fn default_odds_timeout() -> u64 {
    10
}
fn default_retry_attempts() -> u32 {
    2
}
fn default_retry_backoff() -> u64 {
    500
}
fn default_card_size() -> usize {
    8
}
fn default_snippet_games() -> usize {
    3
}
fn default_llm_provider() -> String {
    "openai".to_string()
}
fn default_temperature() -> f64 {
    0.7
}
fn default_max_tokens() -> u32 {
    200
}
fn default_parlay_max_tokens() -> u32 {
    400
}
fn default_llm_timeout() -> u64 {
    30
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    10000
}
fn default_kelly_multiplier() -> f64 {
    0.25
}
fn default_starting_units() -> Decimal {
    Decimal::ONE_HUNDRED
}
fn default_history_limit() -> usize {
    50
}
fn default_per_minute() -> u32 {
    10
}
fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from file and environment
    pub fn load(path: &str) -> Result<Self> {
        dotenvy::dotenv().ok();

        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("SHARPLINE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut cfg: Config = settings.try_deserialize()?;
        cfg.apply_legacy_env(|key| std::env::var(key).ok());
        Ok(cfg)
    }

    /// Apply the single-name variables older deployments use
    pub fn apply_legacy_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("TELEGRAM_TOKEN").filter(|v| !v.is_empty()) {
            self.telegram.bot_token = token;
        }
        if let Some(key) = lookup("ODDS_API_KEY").filter(|v| !v.is_empty()) {
            self.odds.api_key = key;
        }
        if let Some(key) = lookup("OPENAI_KEY").filter(|v| !v.is_empty()) {
            match self.llm.as_mut() {
                Some(llm) => llm.api_key = key,
                None => {
                    self.llm = Some(LlmConfig {
                        provider: default_llm_provider(),
                        api_key: key,
                        model: None,
                        base_url: None,
                        temperature: default_temperature(),
                        max_tokens: default_max_tokens(),
                        parlay_max_tokens: default_parlay_max_tokens(),
                        timeout_secs: default_llm_timeout(),
                    })
                }
            }
        }
        if let Some(port) = lookup("PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
    }

    /// Settings required to talk to Telegram
    pub fn validate_telegram(&self) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            return Err(BotError::NotConfigured("telegram.bot_token"));
        }
        Ok(())
    }

    /// State file path with `~` expanded
    pub fn state_path(&self) -> Option<PathBuf> {
        self.bankroll
            .state_path
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .map(|p| PathBuf::from(shellexpand::tilde(p).into_owned()))
    }
}
