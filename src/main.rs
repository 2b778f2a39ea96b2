//! LADDER — autonomous loss-progression wager runtime.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! restores state from disk (or creates fresh), wires the simulated
//! venue adapter to the wager controller, and serves the dashboard
//! until a shutdown signal arrives.

use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use ladderbot::adapter::sim::SimAdapter;
use ladderbot::config;
use ladderbot::dashboard;
use ladderbot::engine::WagerController;
use ladderbot::notify::{BotEvent, Notifier, Severity};

const BANNER: &str = r#"
 _          _    ____  ____  _____ ____
| |        / \  |  _ \|  _ \| ____|  _ \
| |       / _ \ | | | | | | |  _| | |_) |
| |___   / ___ \| |_| | |_| | |___|  _ <
|_____| /_/   \_\____/|____/|_____|_| \_\

  Loss-Adaptive Double-Down Escalation Runtime
  v0.1.0 — Wager Automation
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    // Load configuration from TOML
    let cfg = config::AppConfig::load("config.toml")?;

    // Initialise structured logging
    init_logging();

    // Print startup banner
    println!("{BANNER}");
    info!(
        bot_name = %cfg.bot.name,
        cycle_delay_ms = cfg.bot.cycle_delay_ms,
        test_mode = cfg.bot.test_mode,
        rungs = cfg.ladder.rungs.len(),
        profit_threshold = %cfg.guard.profit_threshold,
        loss_threshold = %cfg.guard.loss_threshold,
        "LADDER starting up"
    );

    // -- Wire components ---------------------------------------------------

    let notifier = Notifier::new(256);
    spawn_event_forwarder(&notifier);

    // The simulated venue stands in for a live game adapter.
    let adapter = Arc::new(SimAdapter::new(&cfg.sim));

    let (handle, controller_task) =
        WagerController::spawn(&cfg, adapter, notifier.clone())?;

    if cfg.dashboard.enabled {
        dashboard::spawn_dashboard(handle.clone(), cfg.dashboard.port)?;
    }

    if cfg.bot.autostart {
        handle.start(cfg.bot.cycle_delay_ms, cfg.bot.test_mode).await?;
    } else {
        info!("Autostart disabled; waiting for a start command");
    }

    // -- Run until shutdown ------------------------------------------------

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received.");

    handle.stop().await?;
    if let Ok(state) = handle.state().await {
        info!(%state, "Final state");
    }
    handle.shutdown().await?;
    controller_task.await?;

    info!("LADDER shut down cleanly.");
    Ok(())
}

/// Forward bus events to the log, standing in for a UI observer.
fn spawn_event_forwarder(notifier: &Notifier) {
    let mut events = notifier.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(BotEvent::Log { message, severity }) => match severity {
                    Severity::Info => info!(target: "ladderbot::events", "{message}"),
                    Severity::Warn => warn!(target: "ladderbot::events", "{message}"),
                    Severity::Error => error!(target: "ladderbot::events", "{message}"),
                },
                Ok(BotEvent::StateChanged(state)) => {
                    debug!(target: "ladderbot::events", %state, "State changed");
                }
                Ok(BotEvent::BalanceChanged(history)) => {
                    debug!(
                        target: "ladderbot::events",
                        checkpoints = history.len(),
                        "Balance history updated"
                    );
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event forwarder lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ladderbot=info"));

    let json_logging = std::env::var("LADDERBOT_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
