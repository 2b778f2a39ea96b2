//! Capital guard.
//!
//! Post-cycle evaluator of cumulative profit/loss against the configured
//! bounds. A breach orders the controller to stop, checkpoint the ledger,
//! reset the counters, and restart after a cooldown — bounding exposure
//! per run and converting every completed run into one durable ledger
//! entry.

use rust_decimal::Decimal;
use std::fmt;
use std::time::Duration;

use crate::config::GuardSettings;
use crate::types::{BotError, BotState};

/// Which bound was crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreachReason {
    ProfitTarget,
    LossLimit,
}

impl fmt::Display for BreachReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreachReason::ProfitTarget => write!(f, "profit target exceeded"),
            BreachReason::LossLimit => write!(f, "loss limit exceeded"),
        }
    }
}

/// A tripped guard: the reason plus the cumulative profit at the time
/// of the breach (the delta the ledger checkpoint will carry).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Breach {
    pub reason: BreachReason,
    pub profit: Decimal,
}

#[derive(Debug, Clone)]
pub struct CapitalGuard {
    profit_threshold: Decimal,
    loss_threshold: Decimal,
    restart_delay: Duration,
}

impl CapitalGuard {
    /// Both thresholds must be strictly positive.
    pub fn new(settings: &GuardSettings) -> Result<Self, BotError> {
        if settings.profit_threshold <= Decimal::ZERO {
            return Err(BotError::Config(format!(
                "profit threshold {} must be positive",
                settings.profit_threshold
            )));
        }
        if settings.loss_threshold <= Decimal::ZERO {
            return Err(BotError::Config(format!(
                "loss threshold {} must be positive",
                settings.loss_threshold
            )));
        }
        Ok(Self {
            profit_threshold: settings.profit_threshold,
            loss_threshold: settings.loss_threshold,
            restart_delay: Duration::from_millis(settings.restart_delay_ms),
        })
    }

    /// Breach iff cumulative profit strictly exceeds the profit bound,
    /// or strictly undercuts the negated loss bound.
    pub fn evaluate(&self, state: &BotState) -> Option<Breach> {
        if state.total_profit > self.profit_threshold {
            Some(Breach {
                reason: BreachReason::ProfitTarget,
                profit: state.total_profit,
            })
        } else if state.total_profit < -self.loss_threshold {
            Some(Breach {
                reason: BreachReason::LossLimit,
                profit: state.total_profit,
            })
        } else {
            None
        }
    }

    /// Cooldown before the post-breach automatic restart.
    pub fn restart_delay(&self) -> Duration {
        self.restart_delay
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
