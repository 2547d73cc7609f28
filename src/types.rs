//! Core types for odds, games and wagers

use crate::error::{BotError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of betting market a quote belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketKind {
    Moneyline,
    Spread,
    Total,
    PlayerProp,
}

impl MarketKind {
    /// Map an Odds API market key (`h2h`, `spreads`, `player_pass_yds`, ...)
    pub fn from_api_key(key: &str) -> Option<Self> {
        match key {
            "h2h" => Some(Self::Moneyline),
            "spreads" => Some(Self::Spread),
            "totals" => Some(Self::Total),
            k if k.starts_with("player_") => Some(Self::PlayerProp),
            _ => None,
        }
    }
}

/// One bookmaker's number for one outcome of one game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsQuote {
    pub book: String,
    pub market: MarketKind,
    /// Team or player name
    pub subject: String,
    /// Outcome side for props and totals ("Over"/"Under")
    pub side: Option<String>,
    /// Spread / total / prop line, absent for moneyline
    pub line: Option<f64>,
    /// Decimal odds
    pub price: f64,
}

/// Quotes from a single book, in the order the API listed them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookQuotes {
    pub book: String,
    pub quotes: Vec<OddsQuote>,
}

/// A scheduled contest with every quote seen on the last fetch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub id: String,
    pub sport: String,
    pub home: String,
    pub away: String,
    pub start: DateTime<Utc>,
    pub books: Vec<BookQuotes>,
}

impl GameRecord {
    /// All quotes across books
    pub fn quotes(&self) -> impl Iterator<Item = &OddsQuote> {
        self.books.iter().flat_map(|b| b.quotes.iter())
    }

    pub fn quotes_of(&self, market: MarketKind) -> impl Iterator<Item = &OddsQuote> {
        self.quotes().filter(move |q| q.market == market)
    }

    pub fn has_odds(&self) -> bool {
        self.quotes().next().is_some()
    }

    /// Spread for `subject` from the first book that lists one
    pub fn spread_for(&self, subject: &str) -> Option<f64> {
        self.quotes_of(MarketKind::Spread)
            .find(|q| q.subject == subject)
            .and_then(|q| q.line)
            .filter(|l| l.is_finite())
    }

    /// Over/under line from the first book that lists one
    pub fn total_line(&self) -> Option<f64> {
        self.quotes_of(MarketKind::Total)
            .find(|q| {
                q.side
                    .as_deref()
                    .map(|s| s.eq_ignore_ascii_case("over"))
                    .unwrap_or(false)
            })
            .and_then(|q| q.line)
            .filter(|l| l.is_finite())
    }

    /// Moneyline price for `subject` from the first book that lists one
    pub fn moneyline_for(&self, subject: &str) -> Option<f64> {
        self.quotes_of(MarketKind::Moneyline)
            .find(|q| q.subject == subject)
            .map(|q| q.price)
            .filter(|p| p.is_finite())
    }

    /// "Away @ Home"
    pub fn matchup(&self) -> String {
        format!("{} @ {}", self.away, self.home)
    }
}

/// A proposed bet, alive for one request/response cycle
#[derive(Debug, Clone, PartialEq)]
pub struct WagerEstimate {
    pub description: String,
    pub confidence: f64,
    pub decimal_odds: f64,
}

impl WagerEstimate {
    pub fn new(description: impl Into<String>, confidence: f64, decimal_odds: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(BotError::InvalidConfidence(confidence));
        }
        if !decimal_odds.is_finite() || decimal_odds <= 1.0 {
            return Err(BotError::InvalidOdds(decimal_odds));
        }
        Ok(Self {
            description: description.into(),
            confidence,
            decimal_odds,
        })
    }
}

/// Letter grade for a wager confidence, ordered worst to best
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "F")]
    F,
    #[serde(rename = "C")]
    C,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "B+")]
    BPlus,
    #[serde(rename = "A")]
    A,
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Grade::A => "A",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::C => "C",
            Grade::F => "F",
        };
        f.write_str(s)
    }
}

impl PartialEq<&str> for Grade {
    fn eq(&self, other: &&str) -> bool {
        self.to_string() == *other
    }
}

/// One bankroll movement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub at: DateTime<Utc>,
    pub delta: Decimal,
    pub balance: Decimal,
    pub note: String,
}
