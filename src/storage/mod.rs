//! Persistence layer.
//!
//! Saves and loads the controller state plus balance history to/from a
//! JSON file. Writes are fire-and-forget after each mutation: a failed
//! save is reported and retried implicitly at the next mutation, with
//! the in-memory state staying authoritative.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::types::{BalancePoint, BotState};

/// Default state file path.
const DEFAULT_STATE_FILE: &str = "ladderbot_state.json";

/// The persisted blob: controller state (including run settings) and
/// the balance-history checkpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    pub bot: BotState,
    #[serde(default)]
    pub balance_history: Vec<BalancePoint>,
}

/// Save controller state to a JSON file.
pub fn save_state(state: &PersistedState, path: Option<&str>) -> Result<()> {
    let path = path.unwrap_or(DEFAULT_STATE_FILE);
    let json = serde_json::to_string_pretty(state)
        .context("Failed to serialise controller state")?;

    std::fs::write(path, &json)
        .context(format!("Failed to write state to {path}"))?;

    debug!(path, profit = %state.bot.total_profit, "State saved");
    Ok(())
}

/// Load controller state from a JSON file.
/// Returns None if the file doesn't exist (fresh start).
pub fn load_state(path: Option<&str>) -> Result<Option<PersistedState>> {
    let path = path.unwrap_or(DEFAULT_STATE_FILE);

    if !Path::new(path).exists() {
        info!(path, "No saved state found, starting fresh");
        return Ok(None);
    }

    let json = std::fs::read_to_string(path)
        .context(format!("Failed to read state from {path}"))?;

    let state: PersistedState = serde_json::from_str(&json)
        .context(format!("Failed to parse state from {path}"))?;

    info!(
        path,
        step = state.bot.step,
        profit = %state.bot.total_profit,
        checkpoints = state.balance_history.len(),
        "State loaded from disk"
    );

    Ok(Some(state))
}

/// Delete the state file (for testing or reset).
pub fn delete_state(path: Option<&str>) -> Result<()> {
    let path = path.unwrap_or(DEFAULT_STATE_FILE);
    if Path::new(path).exists() {
        std::fs::remove_file(path)
            .context(format!("Failed to delete state file {path}"))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
