//! Mock venue for integration testing.
//!
//! Provides a deterministic `GameAdapter` implementation driven by a
//! scripted queue of outcomes: each submission reveals the next queued
//! multiplier immediately, and an empty queue leaves the signal stale
//! (the ambiguous-settlement path). All state is in-memory and fully
//! controllable from test code.

use anyhow::{bail, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use ladderbot::adapter::{ControlHandle, GameAdapter};

pub struct MockVenue {
    outcomes: Mutex<VecDeque<Decimal>>,
    revealed: Mutex<Option<Decimal>>,
    controls_available: AtomicBool,
    stakes: Mutex<Vec<Decimal>>,
    payouts: Mutex<Vec<Decimal>>,
    submits: AtomicUsize,
}

impl MockVenue {
    /// A venue that will reveal the given outcomes, one per submission.
    pub fn new(outcomes: Vec<Decimal>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            revealed: Mutex::new(None),
            controls_available: AtomicBool::new(true),
            stakes: Mutex::new(Vec::new()),
            payouts: Mutex::new(Vec::new()),
            submits: AtomicUsize::new(0),
        }
    }

    /// Toggle whether the controls can be located (venue page "loaded").
    pub fn set_controls_available(&self, available: bool) {
        self.controls_available.store(available, Ordering::SeqCst);
    }

    /// Every stake value written so far.
    pub fn stakes(&self) -> Vec<Decimal> {
        self.stakes.lock().unwrap().clone()
    }

    /// Every payout value written so far.
    pub fn payouts(&self) -> Vec<Decimal> {
        self.payouts.lock().unwrap().clone()
    }

    /// Number of wagers submitted so far.
    pub fn submit_count(&self) -> usize {
        self.submits.load(Ordering::SeqCst)
    }

    fn locate(&self, id: &str) -> Result<ControlHandle> {
        if self.controls_available.load(Ordering::SeqCst) {
            Ok(ControlHandle::new(id))
        } else {
            bail!("{id} not found")
        }
    }
}

#[async_trait]
impl GameAdapter for MockVenue {
    async fn locate_stake_control(&self) -> Result<ControlHandle> {
        self.locate("mock:stake")
    }

    async fn locate_payout_control(&self) -> Result<ControlHandle> {
        self.locate("mock:payout")
    }

    async fn locate_submit_control(&self) -> Result<ControlHandle> {
        self.locate("mock:submit")
    }

    async fn set_value(&self, control: &ControlHandle, value: Decimal) -> Result<()> {
        match control.id() {
            "mock:stake" => self.stakes.lock().unwrap().push(value),
            "mock:payout" => self.payouts.lock().unwrap().push(value),
            other => bail!("unknown control: {other}"),
        }
        Ok(())
    }

    async fn submit(&self, _control: &ControlHandle) -> Result<()> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        if let Some(next) = self.outcomes.lock().unwrap().pop_front() {
            *self.revealed.lock().unwrap() = Some(next);
        }
        // An exhausted queue leaves the signal stale: the poller times
        // out and the round stays inconclusive.
        Ok(())
    }

    async fn read_outcome_signal(&self) -> Option<Decimal> {
        *self.revealed.lock().unwrap()
    }

    fn name(&self) -> &str {
        "mock-venue"
    }
}
