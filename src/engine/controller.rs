//! Wager controller.
//!
//! The top-level scheduler: owns the run/stop state machine, drives one
//! wager cycle at a time against the venue adapter, updates counters and
//! the balance ledger, and applies the capital guard after each settled
//! cycle. Runs as an actor on its own task; everything else talks to it
//! through a `ControllerHandle`.

use anyhow::Result;
use rust_decimal::Decimal;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, sleep, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::adapter::GameAdapter;
use crate::config::AppConfig;
use crate::engine::guard::{Breach, CapitalGuard};
use crate::engine::poller::ResultPoller;
use crate::ladder::StakeLadder;
use crate::ledger::Ledger;
use crate::notify::{Notifier, Severity};
use crate::storage::{self, PersistedState};
use crate::types::{BalancePoint, BotError, BotState, Outcome, WagerOutcome};

// ---------------------------------------------------------------------------
// Phases & commands
// ---------------------------------------------------------------------------

/// Lifecycle phase of the controller.
///
/// `Idle`: not running. `Armed`: running, waiting for the next tick.
/// `InFlight`: one wager cycle executing under the mutual-exclusion
/// flag. At most one cycle is in flight at any time; a tick that fires
/// while in flight is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Armed,
    InFlight,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::Armed => write!(f, "armed"),
            Phase::InFlight => write!(f, "in-flight"),
        }
    }
}

#[derive(Debug)]
pub enum ControlCommand {
    Start {
        cycle_delay_ms: u64,
        test_mode: bool,
        reply: oneshot::Sender<Result<(), BotError>>,
    },
    Stop {
        reply: oneshot::Sender<()>,
    },
    Reset {
        reply: oneshot::Sender<()>,
    },
    GetState {
        reply: oneshot::Sender<BotState>,
    },
    GetBalanceHistory {
        reply: oneshot::Sender<Vec<BalancePoint>>,
    },
    ClearBalanceHistory {
        reply: oneshot::Sender<()>,
    },
    Shutdown,
}

/// Cloneable handle used by the dashboard, the binary, and tests to
/// drive the controller actor.
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    tx: mpsc::Sender<ControlCommand>,
}

impl ControllerHandle {
    pub async fn start(&self, cycle_delay_ms: u64, test_mode: bool) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(ControlCommand::Start {
                cycle_delay_ms,
                test_mode,
                reply,
            })
            .await
            .map_err(|_| anyhow::anyhow!("controller unavailable"))?;
        rx.await
            .map_err(|_| anyhow::anyhow!("controller dropped the request"))?
            .map_err(Into::into)
    }

    pub async fn stop(&self) -> Result<()> {
        self.unit_command(|reply| ControlCommand::Stop { reply }).await
    }

    pub async fn reset(&self) -> Result<()> {
        self.unit_command(|reply| ControlCommand::Reset { reply }).await
    }

    pub async fn clear_balance_history(&self) -> Result<()> {
        self.unit_command(|reply| ControlCommand::ClearBalanceHistory { reply })
            .await
    }

    pub async fn state(&self) -> Result<BotState> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(ControlCommand::GetState { reply })
            .await
            .map_err(|_| anyhow::anyhow!("controller unavailable"))?;
        rx.await
            .map_err(|_| anyhow::anyhow!("controller dropped the request"))
    }

    pub async fn balance_history(&self) -> Result<Vec<BalancePoint>> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(ControlCommand::GetBalanceHistory { reply })
            .await
            .map_err(|_| anyhow::anyhow!("controller unavailable"))?;
        rx.await
            .map_err(|_| anyhow::anyhow!("controller dropped the request"))
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.tx
            .send(ControlCommand::Shutdown)
            .await
            .map_err(|_| anyhow::anyhow!("controller unavailable"))
    }

    async fn unit_command<F>(&self, build: F) -> Result<()>
    where
        F: FnOnce(oneshot::Sender<()>) -> ControlCommand,
    {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| anyhow::anyhow!("controller unavailable"))?;
        rx.await
            .map_err(|_| anyhow::anyhow!("controller dropped the request"))
    }
}

enum Wake {
    Tick,
    Command(Option<ControlCommand>),
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

pub struct WagerController {
    ladder: StakeLadder,
    poller: ResultPoller,
    guard: CapitalGuard,
    adapter: Arc<dyn GameAdapter>,
    notifier: Notifier,
    state: BotState,
    ledger: Ledger,
    phase: Phase,
    /// The single-flight guard: set before a cycle's first step, cleared
    /// unconditionally on cycle exit.
    in_flight: bool,
    payout_settle: Duration,
    submit_settle: Duration,
    state_file: Option<String>,
    tick: Option<Interval>,
    /// Clone of the actor's own command sender, used to schedule the
    /// post-breach restart through the normal command path.
    command_tx: mpsc::Sender<ControlCommand>,
}

impl WagerController {
    /// Build a controller, restoring any previously persisted state.
    /// The returned receiver must be fed to [`WagerController::run`].
    pub fn new(
        cfg: &AppConfig,
        adapter: Arc<dyn GameAdapter>,
        notifier: Notifier,
    ) -> Result<(Self, ControllerHandle, mpsc::Receiver<ControlCommand>), BotError> {
        let ladder = StakeLadder::from_settings(&cfg.ladder)?;
        let poller = ResultPoller::new(&cfg.poller);
        let guard = CapitalGuard::new(&cfg.guard)?;

        let persisted = match storage::load_state(cfg.storage.state_file.as_deref()) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "Failed to load saved state; starting fresh");
                None
            }
        };
        let (mut state, history) = match persisted {
            Some(p) => (p.bot, p.balance_history),
            None => (
                BotState::new(cfg.bot.cycle_delay_ms, cfg.bot.test_mode),
                Vec::new(),
            ),
        };
        // A process restart never resumes mid-run; wagering requires an
        // explicit start.
        state.running = false;

        let ledger = Ledger::from_points(history, cfg.ladder.history_cap);
        let (tx, rx) = mpsc::channel(32);

        let controller = Self {
            ladder,
            poller,
            guard,
            adapter,
            notifier,
            state,
            ledger,
            phase: Phase::Idle,
            in_flight: false,
            payout_settle: Duration::from_millis(cfg.bot.payout_settle_ms),
            submit_settle: Duration::from_millis(cfg.bot.submit_settle_ms),
            state_file: cfg.storage.state_file.clone(),
            tick: None,
            command_tx: tx.clone(),
        };
        Ok((controller, ControllerHandle { tx }, rx))
    }

    /// Build and spawn the actor task in one step.
    pub fn spawn(
        cfg: &AppConfig,
        adapter: Arc<dyn GameAdapter>,
        notifier: Notifier,
    ) -> Result<(ControllerHandle, tokio::task::JoinHandle<()>), BotError> {
        let (controller, handle, rx) = Self::new(cfg, adapter, notifier)?;
        let join = tokio::spawn(controller.run(rx));
        Ok((handle, join))
    }

    /// The actor loop: serialises commands and wager ticks. Commands
    /// arriving while a cycle is in flight are drained once it commits,
    /// so a stop never aborts an in-progress wager.
    pub async fn run(mut self, mut rx: mpsc::Receiver<ControlCommand>) {
        info!(
            adapter = self.adapter.name(),
            rungs = self.ladder.len(),
            "Wager controller started"
        );

        loop {
            let wake = {
                let tick = async {
                    match self.tick.as_mut() {
                        Some(tick) => {
                            tick.tick().await;
                        }
                        None => std::future::pending::<()>().await,
                    }
                };
                tokio::pin!(tick);
                tokio::select! {
                    cmd = rx.recv() => Wake::Command(cmd),
                    _ = &mut tick => Wake::Tick,
                }
            };

            match wake {
                Wake::Command(None) | Wake::Command(Some(ControlCommand::Shutdown)) => break,
                Wake::Command(Some(cmd)) => self.handle_command(cmd),
                Wake::Tick => self.on_tick().await,
            }
        }

        self.persist();
        info!("Wager controller stopped");
    }

    fn handle_command(&mut self, cmd: ControlCommand) {
        match cmd {
            ControlCommand::Start {
                cycle_delay_ms,
                test_mode,
                reply,
            } => {
                let _ = reply.send(self.start(cycle_delay_ms, test_mode));
            }
            ControlCommand::Stop { reply } => {
                self.stop();
                let _ = reply.send(());
            }
            ControlCommand::Reset { reply } => {
                self.reset_stats();
                let _ = reply.send(());
            }
            ControlCommand::GetState { reply } => {
                let _ = reply.send(self.state.clone());
            }
            ControlCommand::GetBalanceHistory { reply } => {
                let _ = reply.send(self.ledger.snapshot());
            }
            ControlCommand::ClearBalanceHistory { reply } => {
                self.ledger.clear();
                self.persist();
                self.notifier.balance_changed(Vec::new());
                self.notifier.log(Severity::Info, "Balance history cleared");
                let _ = reply.send(());
            }
            ControlCommand::Shutdown => {}
        }
    }

    // -- Lifecycle ---------------------------------------------------------

    fn start(&mut self, cycle_delay_ms: u64, test_mode: bool) -> Result<(), BotError> {
        if cycle_delay_ms == 0 {
            return Err(BotError::Config("cycle delay must be positive".to_string()));
        }
        if self.state.running {
            debug!("Start requested while already running; ignored");
            return Ok(());
        }

        self.state.running = true;
        self.state.cycle_delay_ms = cycle_delay_ms;
        self.state.test_mode = test_mode;
        self.phase = Phase::Armed;

        let mut tick = interval(Duration::from_millis(cycle_delay_ms));
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.tick = Some(tick);

        self.persist();
        self.notifier.state_changed(&self.state);
        self.notifier.log(
            Severity::Info,
            if test_mode {
                "Bot started in test mode (probe stakes only)"
            } else {
                "Bot started"
            },
        );
        info!(cycle_delay_ms, test_mode, "Wagering armed");
        Ok(())
    }

    /// Disarm the tick. An in-flight cycle always runs to completion
    /// first (commands are serialised with cycles).
    fn stop(&mut self) {
        self.state.running = false;
        self.tick = None;
        self.phase = Phase::Idle;

        self.persist();
        self.notifier.state_changed(&self.state);
        self.notifier.log(Severity::Info, "Bot stopped");
        info!("Wagering disarmed");
    }

    /// Zero the counters, first checkpointing any realised profit into
    /// the balance ledger.
    fn reset_stats(&mut self) {
        let delta = self.state.total_profit;
        if !delta.is_zero() {
            let point = self.ledger.append(delta);
            self.notifier.balance_changed(self.ledger.snapshot());
            info!(delta = %delta, balance = %point.balance, "Balance checkpoint recorded");
        }

        self.state.reset_counters();
        self.persist();
        self.notifier.state_changed(&self.state);
        self.notifier.log(Severity::Info, "Stats reset, starting fresh");
    }

    // -- Cycle protocol ----------------------------------------------------

    async fn on_tick(&mut self) {
        if !self.state.running {
            return;
        }
        if self.in_flight {
            debug!("Cycle already in flight; tick skipped");
            return;
        }
        self.run_cycle().await;
    }

    /// Execute one wager cycle under the single-flight guard. The guard
    /// is cleared unconditionally on exit, error paths included.
    pub async fn run_cycle(&mut self) {
        if !self.begin_cycle() {
            return;
        }
        match self.execute_cycle().await {
            Ok(()) => {}
            Err(BotError::AmbiguousSettlement) => {
                info!("No settled outcome within the window; retrying at the same rung");
                self.notifier
                    .log(Severity::Warn, "Inconclusive round, will retry");
            }
            Err(e) => {
                warn!(error = %e, "Cycle aborted; will retry next tick");
                self.notifier
                    .log(Severity::Warn, &format!("Cycle aborted: {e}"));
            }
        }
        self.end_cycle();
    }

    fn begin_cycle(&mut self) -> bool {
        if self.in_flight {
            return false;
        }
        self.in_flight = true;
        self.phase = Phase::InFlight;
        true
    }

    fn end_cycle(&mut self) {
        self.in_flight = false;
        self.phase = if self.state.running {
            Phase::Armed
        } else {
            Phase::Idle
        };
    }

    async fn execute_cycle(&mut self) -> Result<(), BotError> {
        // 1. Normalise the ladder position before using it.
        let normalized = self.ladder.clamp_step(self.state.step);
        if normalized != self.state.step {
            warn!(step = self.state.step, "Step out of range; resetting to rung 1");
            self.state.step = normalized;
        }
        let step = self.state.step;
        let stake = self.ladder.stake_for(step, self.state.test_mode);
        let payout = self.ladder.payout_for(step);

        // 2. Locate every required control up front; abort before any
        // state mutation if the venue is not ready.
        let stake_control = self
            .adapter
            .locate_stake_control()
            .await
            .map_err(|e| BotError::AdapterUnavailable(format!("stake control: {e}")))?;
        let payout_control = self
            .adapter
            .locate_payout_control()
            .await
            .map_err(|e| BotError::AdapterUnavailable(format!("payout control: {e}")))?;
        let submit_control = self
            .adapter
            .locate_submit_control()
            .await
            .map_err(|e| BotError::AdapterUnavailable(format!("submit control: {e}")))?;

        info!(
            step,
            stake = %stake,
            payout = %payout,
            test_mode = self.state.test_mode,
            "Placing wager"
        );

        // 3. Sequence the field writes with settle pauses; the venue
        // applies input asynchronously.
        self.adapter
            .set_value(&payout_control, payout)
            .await
            .map_err(|e| BotError::AdapterUnavailable(format!("payout write: {e}")))?;
        sleep(self.payout_settle).await;
        self.adapter
            .set_value(&stake_control, stake)
            .await
            .map_err(|e| BotError::AdapterUnavailable(format!("stake write: {e}")))?;
        sleep(self.submit_settle).await;

        // 4. Baseline the outcome signal, then place the wager.
        let baseline = self.adapter.read_outcome_signal().await;
        self.adapter
            .submit(&submit_control)
            .await
            .map_err(|e| BotError::AdapterUnavailable(format!("submit: {e}")))?;

        // 5. Await settlement. 6. An ambiguous round leaves counters,
        // profit, and step untouched; the next tick retries at the
        // same rung.
        let observed = self
            .poller
            .await_settlement(self.adapter.as_ref(), baseline)
            .await
            .ok_or(BotError::AmbiguousSettlement)?;

        // 7. Classify and commit.
        let settled = WagerOutcome {
            observed,
            outcome: self.ladder.classify(observed, step),
        };
        self.state.last_observed = Some(observed);

        match settled.outcome {
            Outcome::Win => {
                let gain = stake * (payout - Decimal::ONE);
                let advance = self.ladder.advance(Outcome::Win, step);
                self.state.record_win(gain, advance.next_step);
                info!(observed = %observed, gain = %gain, "Round won; back to rung 1");
                self.notifier
                    .log(Severity::Info, &format!("{settled} (+{gain})"));
            }
            Outcome::Lose => {
                let advance = self.ladder.advance(Outcome::Lose, step);
                self.state.record_loss(stake, advance.next_step);
                if advance.wrapped {
                    info!(observed = %observed, "Round lost at the top rung; ladder wraps to base");
                } else {
                    info!(observed = %observed, next_step = advance.next_step, "Round lost; escalating");
                }
                self.notifier
                    .log(Severity::Warn, &format!("{settled} (-{stake})"));
            }
        }

        // 8. Persist and notify.
        self.persist();
        self.notifier.state_changed(&self.state);

        // 9. Capital guard.
        if let Some(breach) = self.guard.evaluate(&self.state) {
            self.apply_breach(breach);
        }
        Ok(())
    }

    /// A tripped guard stops wagering, checkpoints the run into the
    /// ledger, zeroes the counters, and schedules a restart that keeps
    /// the current cycle delay and test-mode flag.
    fn apply_breach(&mut self, breach: Breach) {
        let cycle_delay_ms = self.state.cycle_delay_ms;
        let test_mode = self.state.test_mode;

        warn!(
            profit = %breach.profit,
            reason = %breach.reason,
            "Capital guard tripped; stopping and resetting"
        );
        self.notifier.log(
            Severity::Warn,
            &format!("Auto-reset: {} ({:+})", breach.reason, breach.profit),
        );

        self.stop();
        self.reset_stats();

        let delay = self.guard.restart_delay();
        let tx = self.command_tx.clone();
        tokio::spawn(async move {
            sleep(delay).await;
            let (reply, _discard) = oneshot::channel();
            let _ = tx
                .send(ControlCommand::Start {
                    cycle_delay_ms,
                    test_mode,
                    reply,
                })
                .await;
        });
        info!(delay_ms = delay.as_millis() as u64, "Restart scheduled");
    }

    // -- Persistence -------------------------------------------------------

    /// Fire-and-forget save: a failure is reported but never interrupts
    /// the loop, and the in-memory state remains authoritative.
    fn persist(&self) {
        let snapshot = PersistedState {
            bot: self.state.clone(),
            balance_history: self.ledger.snapshot(),
        };
        if let Err(e) = storage::save_state(&snapshot, self.state_file.as_deref()) {
            let err = BotError::Persistence(e.to_string());
            warn!(error = %err, "In-memory state remains authoritative");
            self.notifier.log(Severity::Error, &err.to_string());
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
