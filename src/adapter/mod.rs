//! Game-venue adapters.
//!
//! Defines the `GameAdapter` trait — the opaque boundary behind which all
//! control location, value manipulation, and outcome-signal parsing live.
//! The core never touches selectors, wire formats, or raw strings; an
//! adapter hands it typed handles and typed numbers.

pub mod sim;

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::fmt;

/// Opaque reference to a located venue control (an input field, a
/// submit button). Only meaningful to the adapter that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlHandle(String);

impl ControlHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ControlHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Abstraction over the external game venue.
///
/// Locate calls fail when a control cannot be found (the venue page not
/// loaded, a layout change); the controller treats any such failure as a
/// recoverable condition and retries on the next tick.
/// `read_outcome_signal` returns the currently displayed multiplier, or
/// `None` while the venue shows nothing parseable; staleness and
/// transience are expected, the poller debounces around them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GameAdapter: Send + Sync {
    async fn locate_stake_control(&self) -> Result<ControlHandle>;

    async fn locate_payout_control(&self) -> Result<ControlHandle>;

    async fn locate_submit_control(&self) -> Result<ControlHandle>;

    /// Write a numeric value into a located input control.
    async fn set_value(&self, control: &ControlHandle, value: Decimal) -> Result<()>;

    /// Press a located submit control, placing the wager.
    async fn submit(&self, control: &ControlHandle) -> Result<()>;

    /// Current value of the revealed-outcome signal, if any.
    async fn read_outcome_signal(&self) -> Option<Decimal>;

    /// Adapter name for logging and identification.
    fn name(&self) -> &str;
}
