//! Per-chat bankroll state
//!
//! Balances are abstract units. Every change appends a [`LedgerEntry`];
//! history is trimmed to the configured cap, oldest first.

mod json;

pub use json::JsonFileStore;

use crate::config::BankrollConfig;
use crate::error::{BotError, Result};
use crate::types::LedgerEntry;
use chrono::Utc;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Bankroll persistence used by the command handler
pub trait StateStore: Send + Sync {
    /// Current balance, or the starting units for an unknown chat
    fn balance(&self, user: i64) -> Decimal;

    fn set_balance(&self, user: i64, units: Decimal, note: &str) -> Result<Decimal>;

    /// Apply a signed change and return the new balance
    fn add_units(&self, user: i64, delta: Decimal, note: &str) -> Result<Decimal>;

    /// Most recent entries, newest last
    fn history(&self, user: i64, limit: usize) -> Vec<LedgerEntry>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitBalance {
    pub units: Decimal,
    #[serde(default)]
    pub history: Vec<LedgerEntry>,
}

/// Whole-store snapshot, also the on-disk format
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct StoreState {
    #[serde(default)]
    pub users: BTreeMap<i64, UnitBalance>,
}

impl StoreState {
    fn balance(&self, user: i64, starting: Decimal) -> Decimal {
        self.users.get(&user).map(|u| u.units).unwrap_or(starting)
    }

    fn apply(&mut self, user: i64, balance: Decimal, note: &str, limits: &BankrollConfig) -> Result<Decimal> {
        if balance < Decimal::ZERO {
            return Err(BotError::Store(format!("balance cannot go below zero ({})", balance)));
        }

        let entry = self.users.entry(user).or_insert_with(|| UnitBalance {
            units: limits.starting_units,
            history: Vec::new(),
        });
        let delta = balance - entry.units;
        entry.units = balance;
        entry.history.push(LedgerEntry {
            at: Utc::now(),
            delta,
            balance,
            note: note.to_string(),
        });
        if entry.history.len() > limits.history_limit {
            let excess = entry.history.len() - limits.history_limit;
            entry.history.drain(..excess);
        }
        Ok(balance)
    }

    fn add(&mut self, user: i64, delta: Decimal, note: &str, limits: &BankrollConfig) -> Result<Decimal> {
        let next = self
            .balance(user, limits.starting_units)
            .checked_add(delta)
            .ok_or_else(|| BotError::Store("balance out of range".to_string()))?;
        self.apply(user, next, note, limits)
    }

    fn history(&self, user: i64, limit: usize) -> Vec<LedgerEntry> {
        self.users
            .get(&user)
            .map(|u| {
                let skip = u.history.len().saturating_sub(limit);
                u.history[skip..].to_vec()
            })
            .unwrap_or_default()
    }
}

/// Process-local store, empty on start
pub struct MemoryStore {
    limits: BankrollConfig,
    state: RwLock<StoreState>,
}

impl MemoryStore {
    pub fn new(limits: BankrollConfig) -> Self {
        Self {
            limits,
            state: RwLock::new(StoreState::default()),
        }
    }
}

impl StateStore for MemoryStore {
    fn balance(&self, user: i64) -> Decimal {
        self.state.read().balance(user, self.limits.starting_units)
    }

    fn set_balance(&self, user: i64, units: Decimal, note: &str) -> Result<Decimal> {
        self.state.write().apply(user, units, note, &self.limits)
    }

    fn add_units(&self, user: i64, delta: Decimal, note: &str) -> Result<Decimal> {
        self.state.write().add(user, delta, note, &self.limits)
    }

    fn history(&self, user: i64, limit: usize) -> Vec<LedgerEntry> {
        self.state.read().history(user, limit)
    }
}

/// Store selected by configuration: JSON file when a state path is set
pub fn open_store(limits: &BankrollConfig, path: Option<PathBuf>) -> Result<Arc<dyn StateStore>> {
    match path {
        Some(path) => {
            tracing::info!("Bankroll state file: {}", path.display());
            Ok(Arc::new(JsonFileStore::open(path, limits.clone())?))
        }
        None => {
            tracing::info!("Bankroll state kept in memory");
            Ok(Arc::new(MemoryStore::new(limits.clone())))
        }
    }
}
