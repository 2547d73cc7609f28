//! Sharpline Telegram Betting Bot
//!
//! A keyword-driven Telegram bot that posts a ranked card of today's games,
//! asks a language model for picks and parlays, prices them with standard
//! betting math, and tracks a per-chat bankroll in units.
//!
//! ## Architecture
//!
//! ```text
//! Telegram (webhook / long poll) → Bot (keyword dispatch) → Reply
//!                                    ↑        ↑        ↑
//!               Odds (The Odds API + TTL cache)  LLM  Store (memory / JSON)
//!                                    ↓
//!                     Economics (EV, Kelly, sharp score, grades)
//! ```

pub mod bot;
pub mod config;
pub mod economics;
pub mod error;
pub mod llm;
pub mod odds;
pub mod server;
pub mod store;
pub mod telegram;
pub mod types;

#[cfg(test)]
mod types_tests;
