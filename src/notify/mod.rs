//! Event bus.
//!
//! Fire-and-forget broadcast of state, log, and balance events to
//! whatever observers care to subscribe (the dashboard, the log
//! forwarder in the binary, tests). The core never waits on a receiver
//! and never fails when nobody is listening.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

use crate::types::{BalancePoint, BotState};

/// Severity tag on emitted log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warn => write!(f, "WARN"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum BotEvent {
    StateChanged(BotState),
    Log { message: String, severity: Severity },
    BalanceChanged(Vec<BalancePoint>),
}

/// Cloneable publisher handle over a broadcast channel.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<BotEvent>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BotEvent> {
        self.tx.subscribe()
    }

    pub fn state_changed(&self, state: &BotState) {
        let _ = self.tx.send(BotEvent::StateChanged(state.clone()));
    }

    pub fn log(&self, severity: Severity, message: &str) {
        let _ = self.tx.send(BotEvent::Log {
            message: message.to_string(),
            severity,
        });
    }

    pub fn balance_changed(&self, history: Vec<BalancePoint>) {
        let _ = self.tx.send(BotEvent::BalanceChanged(history));
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(64)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
