//! Simulated game venue.
//!
//! An in-process stand-in for the real venue: accepts stake/payout
//! writes, and on submission reveals a fresh multiplier after a short
//! delay, the way the live game animates its reveal. Used by the binary
//! for dry runs and by tests that need a full adapter without a venue.
//!
//! The draw is the usual house-edged inverse-uniform crash curve:
//! `m = (1 - edge) / (1 - u)` for uniform `u`, floored at 1.00 and
//! rounded to two decimals. Consecutive draws can collide on the same
//! value, in which case the poller reports that round inconclusive —
//! the same behaviour a stale live signal produces.

use anyhow::Result;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

use crate::adapter::{ControlHandle, GameAdapter};
use crate::config::SimSettings;

const MAX_MULTIPLIER: f64 = 1_000_000.0;

pub struct SimAdapter {
    reveal_delay: Duration,
    house_edge: f64,
    rng: Mutex<StdRng>,
    revealed: Arc<Mutex<Option<Decimal>>>,
    stake: Mutex<Option<Decimal>>,
    payout: Mutex<Option<Decimal>>,
}

impl SimAdapter {
    pub fn new(settings: &SimSettings) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            reveal_delay: Duration::from_millis(settings.reveal_delay_ms),
            house_edge: settings.house_edge.clamp(0.0, 0.99),
            rng: Mutex::new(rng),
            revealed: Arc::new(Mutex::new(None)),
            stake: Mutex::new(None),
            payout: Mutex::new(None),
        }
    }

    /// Last stake value written, if any (test observability).
    pub fn last_stake(&self) -> Option<Decimal> {
        *self.stake.lock().unwrap()
    }

    /// Last payout value written, if any (test observability).
    pub fn last_payout(&self) -> Option<Decimal> {
        *self.payout.lock().unwrap()
    }

    fn draw_multiplier(&self) -> Decimal {
        let u: f64 = self.rng.lock().unwrap().gen();
        let raw = ((1.0 - self.house_edge) / (1.0 - u)).clamp(1.0, MAX_MULTIPLIER);
        Decimal::from_f64(raw)
            .unwrap_or(Decimal::ONE)
            .round_dp(2)
            .max(Decimal::ONE)
    }
}

#[async_trait]
impl GameAdapter for SimAdapter {
    async fn locate_stake_control(&self) -> Result<ControlHandle> {
        Ok(ControlHandle::new("sim:stake"))
    }

    async fn locate_payout_control(&self) -> Result<ControlHandle> {
        Ok(ControlHandle::new("sim:payout"))
    }

    async fn locate_submit_control(&self) -> Result<ControlHandle> {
        Ok(ControlHandle::new("sim:submit"))
    }

    async fn set_value(&self, control: &ControlHandle, value: Decimal) -> Result<()> {
        match control.id() {
            "sim:stake" => *self.stake.lock().unwrap() = Some(value),
            "sim:payout" => *self.payout.lock().unwrap() = Some(value),
            other => anyhow::bail!("unknown sim control: {other}"),
        }
        Ok(())
    }

    async fn submit(&self, control: &ControlHandle) -> Result<()> {
        if control.id() != "sim:submit" {
            anyhow::bail!("unknown sim control: {}", control.id());
        }
        let multiplier = self.draw_multiplier();
        debug!(round = %uuid::Uuid::new_v4(), multiplier = %multiplier, "Sim round submitted");

        if self.reveal_delay.is_zero() {
            *self.revealed.lock().unwrap() = Some(multiplier);
        } else {
            let revealed = Arc::clone(&self.revealed);
            let delay = self.reveal_delay;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                *revealed.lock().unwrap() = Some(multiplier);
            });
        }
        Ok(())
    }

    async fn read_outcome_signal(&self) -> Option<Decimal> {
        *self.revealed.lock().unwrap()
    }

    fn name(&self) -> &str {
        "sim"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
