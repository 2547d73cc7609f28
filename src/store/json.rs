//! Bankroll state persisted to a single JSON file

use super::{StateStore, StoreState};
use crate::config::BankrollConfig;
use crate::error::{BotError, Result};
use crate::types::LedgerEntry;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Loads once at startup and rewrites the whole file on every change.
///
/// Mutations run under the writer lock: the new state is written to a
/// sibling temp file, renamed over the live file, and only then committed in
/// memory. A failed write leaves both file and memory unchanged.
pub struct JsonFileStore {
    path: PathBuf,
    limits: BankrollConfig,
    state: RwLock<StoreState>,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>, limits: BankrollConfig) -> Result<Self> {
        let path = path.into();
        let state = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                StoreState::default()
            } else {
                serde_json::from_str(&raw).map_err(|e| {
                    BotError::Store(format!("corrupt state file {}: {}", path.display(), e))
                })?
            }
        } else {
            StoreState::default()
        };

        tracing::debug!("Loaded bankroll state for {} chats", state.users.len());

        Ok(Self {
            path,
            limits,
            state: RwLock::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn mutate<F>(&self, change: F) -> Result<Decimal>
    where
        F: FnOnce(&mut StoreState, &BankrollConfig) -> Result<Decimal>,
    {
        let mut state = self.state.write();
        let mut next = state.clone();
        let balance = change(&mut next, &self.limits)?;
        write_atomic(&self.path, &next)?;
        *state = next;
        Ok(balance)
    }
}

fn write_atomic(path: &Path, state: &StoreState) -> Result<()> {
    let json = serde_json::to_string_pretty(state)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("tmp");
    let cleanup_and_err = |e: std::io::Error| {
        let _ = fs::remove_file(&temp_path);
        BotError::Io(e)
    };

    let mut file = fs::File::create(&temp_path)?;
    file.write_all(json.as_bytes()).map_err(cleanup_and_err)?;
    file.sync_all().map_err(cleanup_and_err)?;
    fs::rename(&temp_path, path).map_err(cleanup_and_err)?;
    Ok(())
}

impl StateStore for JsonFileStore {
    fn balance(&self, user: i64) -> Decimal {
        self.state.read().balance(user, self.limits.starting_units)
    }

    fn set_balance(&self, user: i64, units: Decimal, note: &str) -> Result<Decimal> {
        self.mutate(|state, limits| state.apply(user, units, note, limits))
    }

    fn add_units(&self, user: i64, delta: Decimal, note: &str) -> Result<Decimal> {
        self.mutate(|state, limits| state.add(user, delta, note, limits))
    }

    fn history(&self, user: i64, limit: usize) -> Vec<LedgerEntry> {
        self.state.read().history(user, limit)
    }
}
