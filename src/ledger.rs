//! Balance-history ledger.
//!
//! An append-only, bounded series of realised cumulative-balance
//! checkpoints. Entries are created only at a run boundary (manual or
//! guard-triggered reset) and never mutated — only appended, or evicted
//! FIFO once the cap is reached.

use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::VecDeque;

use crate::types::BalancePoint;

#[derive(Debug, Clone)]
pub struct Ledger {
    points: VecDeque<BalancePoint>,
    cap: usize,
}

impl Ledger {
    pub fn new(cap: usize) -> Self {
        Self {
            points: VecDeque::new(),
            cap: cap.max(1),
        }
    }

    /// Rebuild a ledger from persisted points, re-applying the cap.
    pub fn from_points(points: Vec<BalancePoint>, cap: usize) -> Self {
        let cap = cap.max(1);
        let mut points: VecDeque<BalancePoint> = points.into();
        while points.len() > cap {
            points.pop_front();
        }
        Self { points, cap }
    }

    /// Cumulative balance of the latest checkpoint, zero when empty.
    pub fn last_balance(&self) -> Decimal {
        self.points
            .back()
            .map(|p| p.balance)
            .unwrap_or(Decimal::ZERO)
    }

    /// Append a new checkpoint carrying `last_balance + delta`,
    /// evicting the oldest entry once past the cap.
    pub fn append(&mut self, delta: Decimal) -> BalancePoint {
        let point = BalancePoint {
            timestamp: Utc::now(),
            balance: self.last_balance() + delta,
        };
        self.points.push_back(point.clone());
        while self.points.len() > self.cap {
            self.points.pop_front();
        }
        point
    }

    /// Empty the series (the explicit "cycle reset", distinct from the
    /// profit/loss auto-reset which appends).
    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn snapshot(&self) -> Vec<BalancePoint> {
        self.points.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
