//! End-to-end controller scenarios.
//!
//! Drives the full wager loop — controller actor, poller, guard, ledger,
//! persistence — against the scripted mock venue, under paused time for
//! determinism.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

use ladderbot::config::{AppConfig, RungSettings};
use ladderbot::engine::{ControllerHandle, WagerController};
use ladderbot::notify::Notifier;
use ladderbot::storage;
use ladderbot::types::BotState;

use crate::mock_adapter::MockVenue;

fn temp_state_file() -> String {
    let mut p = std::env::temp_dir();
    p.push(format!("ladderbot_sim_test_{}.json", uuid::Uuid::new_v4()));
    p.to_string_lossy().to_string()
}

fn fast_config(state_file: &str) -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.bot.cycle_delay_ms = 50;
    cfg.bot.payout_settle_ms = 1;
    cfg.bot.submit_settle_ms = 1;
    cfg.poller.poll_interval_ms = 5;
    cfg.poller.settle_delay_ms = 5;
    cfg.poller.timeout_ms = 200;
    cfg.guard.profit_threshold = dec!(2.6);
    cfg.guard.loss_threshold = dec!(5.0);
    cfg.guard.restart_delay_ms = 100;
    cfg.storage.state_file = Some(state_file.to_string());
    cfg
}

fn spawn(cfg: &AppConfig, venue: Arc<MockVenue>) -> (ControllerHandle, tokio::task::JoinHandle<()>) {
    WagerController::spawn(cfg, venue, Notifier::new(256)).unwrap()
}

async fn wait_until<F>(handle: &ControllerHandle, what: &str, pred: F) -> BotState
where
    F: Fn(&BotState) -> bool,
{
    for _ in 0..500 {
        let state = handle.state().await.unwrap();
        if pred(&state) {
            return state;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for: {what}");
}

#[tokio::test(start_paused = true)]
async fn win_returns_to_base_rung() {
    let path = temp_state_file();
    let cfg = fast_config(&path);
    let venue = Arc::new(MockVenue::new(vec![dec!(2.0)]));
    let (handle, _task) = spawn(&cfg, Arc::clone(&venue));

    handle.start(50, false).await.unwrap();
    let state = wait_until(&handle, "one settled round", |s| s.rounds_settled() == 1).await;

    assert_eq!(state.wins, 1);
    assert_eq!(state.losses, 0);
    assert_eq!(state.total_profit, dec!(0.01)); // 0.01 * (2 - 1)
    assert_eq!(state.step, 1);
    assert_eq!(state.last_observed, Some(dec!(2.0)));
    assert_eq!(venue.payouts().first(), Some(&dec!(2)));

    handle.shutdown().await.unwrap();
    storage::delete_state(Some(&path)).unwrap();
}

#[tokio::test(start_paused = true)]
async fn loss_escalates_to_next_rung() {
    let path = temp_state_file();
    let cfg = fast_config(&path);
    let venue = Arc::new(MockVenue::new(vec![dec!(1.99)]));
    let (handle, _task) = spawn(&cfg, venue);

    handle.start(50, false).await.unwrap();
    let state = wait_until(&handle, "one settled round", |s| s.rounds_settled() == 1).await;

    assert_eq!(state.wins, 0);
    assert_eq!(state.losses, 1);
    assert_eq!(state.total_profit, dec!(-0.01));
    assert_eq!(state.step, 2);

    handle.shutdown().await.unwrap();
    storage::delete_state(Some(&path)).unwrap();
}

#[tokio::test(start_paused = true)]
async fn top_rung_loss_wraps_to_base_without_counter_reset() {
    let path = temp_state_file();
    let mut cfg = fast_config(&path);
    cfg.ladder.rungs = vec![
        RungSettings { stake: dec!(0.01), payout: dec!(2) },
        RungSettings { stake: dec!(0.02), payout: dec!(2) },
        RungSettings { stake: dec!(0.04), payout: dec!(2) },
    ];
    let venue = Arc::new(MockVenue::new(vec![dec!(1.5), dec!(1.4), dec!(1.3)]));
    let (handle, _task) = spawn(&cfg, Arc::clone(&venue));

    handle.start(50, false).await.unwrap();
    let state = wait_until(&handle, "three settled rounds", |s| s.rounds_settled() == 3).await;

    // Full loss streak through the ladder: the step wraps to base but
    // wins/losses/profit are untouched by the wrap itself.
    assert_eq!(state.step, 1);
    assert_eq!(state.losses, 3);
    assert_eq!(state.wins, 0);
    assert_eq!(state.total_profit, dec!(-0.07));
    assert_eq!(venue.stakes(), vec![dec!(0.01), dec!(0.02), dec!(0.04)]);

    handle.shutdown().await.unwrap();
    storage::delete_state(Some(&path)).unwrap();
}

#[tokio::test(start_paused = true)]
async fn guard_breach_checkpoints_resets_and_restarts() {
    let path = temp_state_file();
    let mut cfg = fast_config(&path);
    cfg.ladder.rungs = vec![RungSettings { stake: dec!(0.9), payout: dec!(2) }];
    let venue = Arc::new(MockVenue::new(vec![dec!(2.0), dec!(2.5), dec!(2.1)]));
    let (handle, _task) = spawn(&cfg, venue);

    handle.start(50, false).await.unwrap();

    // Three wins at +0.90 each push the profit to 2.70, past the 2.6
    // bound: the guard stops, checkpoints, resets, and restarts.
    let mut checkpointed = false;
    for _ in 0..500 {
        if handle.balance_history().await.unwrap().len() == 1 {
            checkpointed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(checkpointed, "guard never checkpointed the run");

    let state = wait_until(&handle, "post-breach restart", |s| {
        s.running && s.total_profit.is_zero() && s.wins == 0
    })
    .await;

    assert_eq!(state.step, 1);
    assert_eq!(state.losses, 0);
    assert!(state.last_observed.is_none());
    // Run settings survive the auto-restart.
    assert_eq!(state.cycle_delay_ms, 50);
    assert!(!state.test_mode);

    // Exactly one durable ledger entry for the completed run.
    let history = handle.balance_history().await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].balance, dec!(2.70));

    handle.shutdown().await.unwrap();
    storage::delete_state(Some(&path)).unwrap();
}

#[tokio::test(start_paused = true)]
async fn ambiguous_settlement_leaves_state_untouched() {
    let path = temp_state_file();
    let cfg = fast_config(&path);
    // No outcomes: the signal never changes after submission.
    let venue = Arc::new(MockVenue::new(Vec::new()));
    let (handle, _task) = spawn(&cfg, Arc::clone(&venue));

    handle.start(50, false).await.unwrap();
    let baseline = wait_until(&handle, "running", |s| s.running).await;

    // Let several cycles time out.
    tokio::time::sleep(Duration::from_millis(800)).await;
    assert!(venue.submit_count() >= 1);

    let after = handle.state().await.unwrap();
    assert_eq!(after, baseline);
    assert_eq!(after.rounds_settled(), 0);
    assert_eq!(after.total_profit, Decimal::ZERO);
    assert_eq!(after.step, 1);
    assert!(after.last_observed.is_none());

    handle.shutdown().await.unwrap();
    storage::delete_state(Some(&path)).unwrap();
}

#[tokio::test(start_paused = true)]
async fn missing_controls_abort_and_recover_next_tick() {
    let path = temp_state_file();
    let cfg = fast_config(&path);
    let venue = Arc::new(MockVenue::new(vec![dec!(2.0)]));
    venue.set_controls_available(false);
    let (handle, _task) = spawn(&cfg, Arc::clone(&venue));

    handle.start(50, false).await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    // Cycles aborted before any mutation or submission.
    assert_eq!(venue.submit_count(), 0);
    let state = handle.state().await.unwrap();
    assert_eq!(state.rounds_settled(), 0);
    assert_eq!(state.step, 1);

    // The venue comes back; the next tick succeeds.
    venue.set_controls_available(true);
    let state = wait_until(&handle, "recovered round", |s| s.rounds_settled() == 1).await;
    assert_eq!(state.wins, 1);

    handle.shutdown().await.unwrap();
    storage::delete_state(Some(&path)).unwrap();
}

#[tokio::test(start_paused = true)]
async fn state_survives_process_restart() {
    let path = temp_state_file();
    let cfg = fast_config(&path);

    let venue = Arc::new(MockVenue::new(vec![dec!(2.0)]));
    let (handle, task) = spawn(&cfg, venue);
    handle.start(50, false).await.unwrap();
    wait_until(&handle, "one settled round", |s| s.rounds_settled() == 1).await;
    handle.shutdown().await.unwrap();
    task.await.unwrap();

    // A fresh controller restores the counters but never auto-resumes.
    let venue = Arc::new(MockVenue::new(Vec::new()));
    let (handle, _task) = spawn(&cfg, venue);
    let state = handle.state().await.unwrap();
    assert!(!state.running);
    assert_eq!(state.wins, 1);
    assert_eq!(state.total_profit, dec!(0.01));
    assert_eq!(state.cycle_delay_ms, 50);

    handle.shutdown().await.unwrap();
    storage::delete_state(Some(&path)).unwrap();
}

#[tokio::test(start_paused = true)]
async fn manual_reset_checkpoints_then_clear_empties() {
    let path = temp_state_file();
    let cfg = fast_config(&path);
    let venue = Arc::new(MockVenue::new(vec![dec!(2.0)]));
    let (handle, _task) = spawn(&cfg, venue);

    handle.start(50, false).await.unwrap();
    wait_until(&handle, "one settled round", |s| s.rounds_settled() == 1).await;
    handle.stop().await.unwrap();

    handle.reset().await.unwrap();
    let state = handle.state().await.unwrap();
    assert_eq!(state.wins, 0);
    assert_eq!(state.total_profit, Decimal::ZERO);

    let history = handle.balance_history().await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].balance, dec!(0.01));

    // A reset with zero profit records nothing further.
    handle.reset().await.unwrap();
    assert_eq!(handle.balance_history().await.unwrap().len(), 1);

    handle.clear_balance_history().await.unwrap();
    assert!(handle.balance_history().await.unwrap().is_empty());

    handle.shutdown().await.unwrap();
    storage::delete_state(Some(&path)).unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_mode_wagers_probe_stakes_only() {
    let path = temp_state_file();
    let cfg = fast_config(&path);
    let venue = Arc::new(MockVenue::new(vec![dec!(1.5), dec!(1.4)]));
    let (handle, _task) = spawn(&cfg, Arc::clone(&venue));

    handle.start(50, true).await.unwrap();
    let state = wait_until(&handle, "two settled rounds", |s| s.rounds_settled() == 2).await;

    // The ladder still escalates and payouts are untouched, but every
    // wager goes out at the probe stake.
    assert_eq!(state.step, 3);
    assert_eq!(state.total_profit, dec!(-0.02));
    assert_eq!(venue.stakes(), vec![dec!(0.01), dec!(0.01)]);
    assert_eq!(venue.payouts(), vec![dec!(2), dec!(2)]);

    handle.shutdown().await.unwrap();
    storage::delete_state(Some(&path)).unwrap();
}

#[tokio::test(start_paused = true)]
async fn stop_halts_new_cycles() {
    let path = temp_state_file();
    let cfg = fast_config(&path);
    let venue = Arc::new(MockVenue::new(vec![dec!(2.0), dec!(2.5), dec!(2.2)]));
    let (handle, _task) = spawn(&cfg, Arc::clone(&venue));

    handle.start(50, false).await.unwrap();
    wait_until(&handle, "one settled round", |s| s.rounds_settled() == 1).await;
    handle.stop().await.unwrap();

    let submits = venue.submit_count();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(venue.submit_count(), submits);

    let state = handle.state().await.unwrap();
    assert!(!state.running);

    handle.shutdown().await.unwrap();
    storage::delete_state(Some(&path)).unwrap();
}
