//! Shared types for the LADDER runtime.
//!
//! These types form the data model used across all modules.
//! They are designed to be stable so that adapter, engine, and
//! dashboard modules can depend on them without circular references.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Wager outcome
// ---------------------------------------------------------------------------

/// Classification of a settled round against the active rung's payout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Win,
    Lose,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Win => write!(f, "WIN"),
            Outcome::Lose => write!(f, "LOSE"),
        }
    }
}

/// The settled result of a single wager: the revealed multiplier and
/// its classification. Produced once per settled cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WagerOutcome {
    pub observed: Decimal,
    pub outcome: Outcome,
}

impl fmt::Display for WagerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}x", self.outcome, self.observed)
    }
}

// ---------------------------------------------------------------------------
// Bot state
// ---------------------------------------------------------------------------

/// Persistent controller state, saved to disk after each mutation.
///
/// Owned exclusively by the controller actor; everything else sees
/// snapshots. `step` is 1-based and always within the ladder bounds
/// after normalisation at the start of each cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotState {
    pub running: bool,
    pub step: usize,
    pub wins: u64,
    pub losses: u64,
    pub total_profit: Decimal,
    pub last_observed: Option<Decimal>,
    pub cycle_delay_ms: u64,
    pub test_mode: bool,
}

impl fmt::Display for BotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | step={} | W{}/L{} | profit={:+} | delay={}ms{}",
            if self.running { "RUNNING" } else { "IDLE" },
            self.step,
            self.wins,
            self.losses,
            self.total_profit,
            self.cycle_delay_ms,
            if self.test_mode { " [TEST]" } else { "" },
        )
    }
}

impl BotState {
    /// Fresh state at rung 1 with the given run settings.
    pub fn new(cycle_delay_ms: u64, test_mode: bool) -> Self {
        Self {
            running: false,
            step: 1,
            wins: 0,
            losses: 0,
            total_profit: Decimal::ZERO,
            last_observed: None,
            cycle_delay_ms,
            test_mode,
        }
    }

    /// Record a won round: counter, realised gain, and fall back to rung 1.
    pub fn record_win(&mut self, gain: Decimal, next_step: usize) {
        self.wins += 1;
        self.total_profit += gain;
        self.step = next_step;
    }

    /// Record a lost round: counter, forfeited stake, and escalate.
    pub fn record_loss(&mut self, stake: Decimal, next_step: usize) {
        self.losses += 1;
        self.total_profit -= stake;
        self.step = next_step;
    }

    /// Zero the per-run counters. Run settings (`cycle_delay_ms`,
    /// `test_mode`) survive a reset.
    pub fn reset_counters(&mut self) {
        self.step = 1;
        self.wins = 0;
        self.losses = 0;
        self.total_profit = Decimal::ZERO;
        self.last_observed = None;
    }

    /// Number of settled rounds this run.
    pub fn rounds_settled(&self) -> u64 {
        self.wins + self.losses
    }

    /// Win rate as a percentage. Returns 0.0 if nothing settled yet.
    pub fn win_rate(&self) -> f64 {
        let settled = self.rounds_settled();
        if settled == 0 {
            0.0
        } else {
            (self.wins as f64 / settled as f64) * 100.0
        }
    }
}

// ---------------------------------------------------------------------------
// Balance history
// ---------------------------------------------------------------------------

/// One cumulative-balance checkpoint, recorded at each run boundary
/// (guard-triggered or manual reset). Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalancePoint {
    pub timestamp: DateTime<Utc>,
    pub balance: Decimal,
}

impl fmt::Display for BalancePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {:+}", self.timestamp.to_rfc3339(), self.balance)
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for the runtime.
///
/// None of these are fatal: the controller aborts the affected cycle,
/// reports the condition, and retries on the next tick.
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    /// A required adapter control could not be located. The cycle is
    /// aborted before any state mutation.
    #[error("Adapter control unavailable: {0}")]
    AdapterUnavailable(String),

    /// Polling timed out without a confirmed outcome change; the cycle
    /// ends with no state mutation and retries at the same rung.
    #[error("Settlement timed out without a confirmed outcome")]
    AmbiguousSettlement,

    /// A save/load against the store failed; in-memory state remains
    /// authoritative and the next successful save reconciles.
    #[error("Persistence failure: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
