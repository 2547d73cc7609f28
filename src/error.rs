//! Error types for the bot

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BotError>;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("API error: {0}")]
    Api(String),

    /// Upstream answered with a non-success status
    #[error("API error: {status}: {message}")]
    Status {
        status: reqwest::StatusCode,
        message: String,
    },

    /// Decimal odds must be greater than 1.0
    #[error("Invalid decimal odds: {0}")]
    InvalidOdds(f64),

    /// Confidence must lie in [0, 1]
    #[error("Invalid confidence: {0}")]
    InvalidConfidence(f64),

    /// A game record lacks the fields a calculation needs
    #[error("Incomplete data: {0}")]
    IncompleteData(String),

    #[error("Telegram error: {0}")]
    Telegram(String),

    #[error("State store error: {0}")]
    Store(String),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}
