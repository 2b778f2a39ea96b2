//! The staking ladder.
//!
//! Pure mapping from ladder position ("rung") to stake amount and payout
//! multiplier, plus the win/loss advancement rules. No side effects —
//! malformed configurations are rejected at construction and nothing
//! else can fail.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::LadderSettings;
use crate::types::{BotError, Outcome};

// ---------------------------------------------------------------------------
// Rungs
// ---------------------------------------------------------------------------

/// One position in the staking progression: a stake amount paired with
/// the payout multiplier that doubles as the win threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rung {
    pub stake: Decimal,
    pub payout: Decimal,
}

/// Result of advancing the ladder after a settled round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Advance {
    pub next_step: usize,
    /// True only when a loss on the top rung wrapped the ladder back to
    /// its base. The wrap resets the step and nothing else.
    pub wrapped: bool,
}

// ---------------------------------------------------------------------------
// StakeLadder
// ---------------------------------------------------------------------------

/// Immutable staking table. Steps are 1-based: `1..=len()`.
#[derive(Debug, Clone)]
pub struct StakeLadder {
    rungs: Vec<Rung>,
    probe_stake: Decimal,
}

impl StakeLadder {
    /// Build a ladder, validating the configuration: at least one rung,
    /// strictly positive stakes, payout multipliers above 1.
    pub fn new(rungs: Vec<Rung>, probe_stake: Decimal) -> Result<Self, BotError> {
        if rungs.is_empty() {
            return Err(BotError::Config("ladder has no rungs".to_string()));
        }
        for (i, rung) in rungs.iter().enumerate() {
            if rung.stake <= Decimal::ZERO {
                return Err(BotError::Config(format!(
                    "rung {} has non-positive stake {}",
                    i + 1,
                    rung.stake
                )));
            }
            if rung.payout <= Decimal::ONE {
                return Err(BotError::Config(format!(
                    "rung {} has payout {} (must exceed 1)",
                    i + 1,
                    rung.payout
                )));
            }
        }
        if probe_stake <= Decimal::ZERO {
            return Err(BotError::Config(format!(
                "probe stake {probe_stake} must be positive"
            )));
        }
        Ok(Self { rungs, probe_stake })
    }

    pub fn from_settings(settings: &LadderSettings) -> Result<Self, BotError> {
        let rungs = settings
            .rungs
            .iter()
            .map(|r| Rung {
                stake: r.stake,
                payout: r.payout,
            })
            .collect();
        Self::new(rungs, settings.probe_stake)
    }

    /// Number of rungs.
    pub fn len(&self) -> usize {
        self.rungs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rungs.is_empty()
    }

    /// Normalise a step into `1..=len()`. Out-of-range values fall back
    /// to the base rung.
    pub fn clamp_step(&self, step: usize) -> usize {
        if step < 1 || step > self.rungs.len() {
            1
        } else {
            step
        }
    }

    /// Stake for a rung. In test mode the probe stake overrides the
    /// table; the payout is never overridden.
    pub fn stake_for(&self, step: usize, test_mode: bool) -> Decimal {
        if test_mode {
            self.probe_stake
        } else {
            self.rungs[self.clamp_step(step) - 1].stake
        }
    }

    /// Payout multiplier (= win threshold) for a rung.
    pub fn payout_for(&self, step: usize) -> Decimal {
        self.rungs[self.clamp_step(step) - 1].payout
    }

    /// Classify a settled multiplier against the rung's payout.
    /// The boundary is inclusive on the winning side.
    pub fn classify(&self, observed: Decimal, step: usize) -> Outcome {
        if observed >= self.payout_for(step) {
            Outcome::Win
        } else {
            Outcome::Lose
        }
    }

    /// Advancement rule: a win falls back to the base rung; a loss
    /// escalates, wrapping to the base once the top rung is exhausted.
    pub fn advance(&self, outcome: Outcome, step: usize) -> Advance {
        let step = self.clamp_step(step);
        match outcome {
            Outcome::Win => Advance {
                next_step: 1,
                wrapped: false,
            },
            Outcome::Lose => {
                if step < self.rungs.len() {
                    Advance {
                        next_step: step + 1,
                        wrapped: false,
                    }
                } else {
                    Advance {
                        next_step: 1,
                        wrapped: true,
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
