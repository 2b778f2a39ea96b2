//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Every field carries a serde default so a partial file (or none of the
//! optional sections) still yields a runnable configuration.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::fs;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub bot: BotSettings,
    pub ladder: LadderSettings,
    pub poller: PollerSettings,
    pub guard: GuardSettings,
    pub sim: SimSettings,
    pub storage: StorageSettings,
    pub dashboard: DashboardSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BotSettings {
    pub name: String,
    /// Period of the wager tick, in milliseconds.
    pub cycle_delay_ms: u64,
    /// Probe-stake mode: the ladder table is overridden with a minimal
    /// stake, payouts are untouched.
    pub test_mode: bool,
    /// Begin wagering immediately on process start.
    pub autostart: bool,
    /// Pause between writing the payout field and the stake field.
    pub payout_settle_ms: u64,
    /// Pause between writing the stake field and pressing submit.
    pub submit_settle_ms: u64,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            name: "LADDER-001".to_string(),
            cycle_delay_ms: 1000,
            test_mode: false,
            autostart: false,
            payout_settle_ms: 200,
            submit_settle_ms: 400,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RungSettings {
    pub stake: Decimal,
    pub payout: Decimal,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LadderSettings {
    pub rungs: Vec<RungSettings>,
    /// Stake substituted for every rung while test mode is active.
    pub probe_stake: Decimal,
    /// Cap on retained balance-history checkpoints (FIFO eviction).
    pub history_cap: usize,
}

impl Default for LadderSettings {
    fn default() -> Self {
        // The production staking table: doubling progression, uniform 2x payout.
        let stakes = [
            dec!(0.01),
            dec!(0.02),
            dec!(0.04),
            dec!(0.1),
            dec!(0.2),
            dec!(0.4),
            dec!(1),
            dec!(2),
            dec!(4),
            dec!(10),
            dec!(20),
            dec!(40),
        ];
        Self {
            rungs: stakes
                .into_iter()
                .map(|stake| RungSettings {
                    stake,
                    payout: dec!(2),
                })
                .collect(),
            probe_stake: dec!(0.01),
            history_cap: 1000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PollerSettings {
    pub poll_interval_ms: u64,
    pub settle_delay_ms: u64,
    pub timeout_ms: u64,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 150,
            settle_delay_ms: 300,
            timeout_ms: 8000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GuardSettings {
    /// Stop-and-reset once cumulative profit strictly exceeds this.
    pub profit_threshold: Decimal,
    /// Stop-and-reset once cumulative loss strictly exceeds this
    /// (compared against the negated profit).
    pub loss_threshold: Decimal,
    /// Cooldown before the automatic restart after a breach.
    pub restart_delay_ms: u64,
}

impl Default for GuardSettings {
    fn default() -> Self {
        Self {
            profit_threshold: dec!(2.6),
            loss_threshold: dec!(5.0),
            restart_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SimSettings {
    /// Delay between submission and the simulated multiplier reveal.
    pub reveal_delay_ms: u64,
    /// House-edge fraction applied to the simulated draw.
    pub house_edge: f64,
    /// Fixed RNG seed for reproducible dry runs; random when absent.
    pub seed: Option<u64>,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            reveal_delay_ms: 500,
            house_edge: 0.01,
            seed: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct StorageSettings {
    /// Path of the JSON state file; the built-in default when absent.
    pub state_file: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DashboardSettings {
    pub enabled: bool,
    pub port: u16,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8088,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }
}
