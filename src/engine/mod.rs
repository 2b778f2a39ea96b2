//! Core engine — the wager control loop.
//!
//! `controller` owns the run/stop state machine and drives one wager
//! cycle at a time; `poller` debounces the asynchronous outcome signal;
//! `guard` enforces the profit/loss exposure bounds.

pub mod poller;
pub mod guard;
pub mod controller;

pub use controller::{ControllerHandle, WagerController};
