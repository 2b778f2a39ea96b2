//! Settlement poller.
//!
//! Watches the venue's outcome signal for a change from the pre-wager
//! baseline and reports exactly one settled value per wager, or nothing
//! on timeout. Two-phase detect-then-confirm: the signal source renders
//! asynchronously and can expose transient intermediate values, so the
//! first changed reading only arms a confirmation read taken after a
//! settle delay.

use rust_decimal::Decimal;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, trace};

use crate::adapter::GameAdapter;
use crate::config::PollerSettings;

#[derive(Debug, Clone)]
pub struct ResultPoller {
    poll_interval: Duration,
    settle_delay: Duration,
    timeout: Duration,
}

impl ResultPoller {
    pub fn new(settings: &PollerSettings) -> Self {
        Self {
            poll_interval: Duration::from_millis(settings.poll_interval_ms),
            settle_delay: Duration::from_millis(settings.settle_delay_ms),
            timeout: Duration::from_millis(settings.timeout_ms),
        }
    }

    /// Await one settlement: the first non-null reading that differs
    /// from `baseline` arms a confirmation read after the settle delay,
    /// whose value is returned. `None` when the window closes without a
    /// confirmed change, in which case the caller must treat the round as ambiguous
    /// and mutate nothing.
    pub async fn await_settlement(
        &self,
        adapter: &dyn GameAdapter,
        baseline: Option<Decimal>,
    ) -> Option<Decimal> {
        let deadline = Instant::now() + self.timeout;

        loop {
            let reading = adapter.read_outcome_signal().await;
            trace!(?reading, ?baseline, "Settlement poll");

            if let Some(value) = reading {
                if baseline != Some(value) {
                    // Changed; let the render settle, then confirm.
                    sleep(self.settle_delay).await;
                    let confirmed = adapter.read_outcome_signal().await;
                    debug!(?confirmed, "Outcome change confirmed");
                    return confirmed;
                }
            }

            if Instant::now() >= deadline {
                debug!(timeout_ms = self.timeout.as_millis() as u64, "Settlement window closed");
                return None;
            }
            sleep(self.poll_interval).await;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
