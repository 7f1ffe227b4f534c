//! Heartbeat Daemon
//!
//! Schedules cycles one at a time: the next cycle is never queued until
//! the previous one has fully resolved. The wait between cycles is the
//! configured base interval with +-30% jitter, stretched to the suspended
//! interval whenever the account was last seen suspended. Shutdown is an
//! `Arc<AtomicBool>` flipped by the signal handler in `main`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use tokio::time::{sleep, Duration};
use tracing::info;

use crate::config::resolve_path;
use crate::memory::MemoryStore;
use crate::types::{DecisionEngine, MoltClient, MoltbotConfig};

use super::cycle::{run_cycle, CycleOutcome};
use super::gates::DailyCounters;

/// Run cycles until `shutdown` flips. Memory is loaded once and kept hot;
/// each cycle persists it on its own.
pub async fn run_loop(
    client: &dyn MoltClient,
    engine: &dyn DecisionEngine,
    config: &MoltbotConfig,
    shutdown: Arc<AtomicBool>,
) {
    let mut store = MemoryStore::load(resolve_path(&config.memory_path));
    let mut daily = DailyCounters::new(Utc::now());
    info!(
        interval_secs = config.heartbeat_interval_secs,
        "heartbeat daemon starting"
    );

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        let seed = rand::random::<u64>();
        let outcome = run_cycle(
            client,
            engine,
            &mut store,
            &mut daily,
            config,
            seed,
            Utc::now(),
        )
        .await;

        let base_secs = if outcome.suspended.is_some() {
            config.suspended_interval_secs
        } else {
            config.heartbeat_interval_secs
        };
        let wait = jittered_interval(base_secs);
        info!(secs = wait.as_secs(), "next heartbeat scheduled");

        if !sleep_until_shutdown(wait, &shutdown).await {
            break;
        }
    }

    info!("heartbeat daemon stopped");
}

/// Single-shot mode: one cycle, then return its outcome.
pub async fn run_once(
    client: &dyn MoltClient,
    engine: &dyn DecisionEngine,
    config: &MoltbotConfig,
) -> CycleOutcome {
    let mut store = MemoryStore::load(resolve_path(&config.memory_path));
    let mut daily = DailyCounters::new(Utc::now());
    let seed = rand::random::<u64>();
    run_cycle(
        client,
        engine,
        &mut store,
        &mut daily,
        config,
        seed,
        Utc::now(),
    )
    .await
}

/// Base interval with +-30% jitter so the cadence never fingerprints.
fn jittered_interval(base_secs: u64) -> Duration {
    let factor = rand::thread_rng().gen_range(0.7..=1.3);
    Duration::from_secs_f64(base_secs as f64 * factor)
}

/// Sleep in one-second slices so a shutdown request is honored promptly.
/// Returns false when shutdown was requested during the wait.
async fn sleep_until_shutdown(total: Duration, shutdown: &AtomicBool) -> bool {
    let mut remaining = total;
    while remaining > Duration::ZERO {
        if shutdown.load(Ordering::SeqCst) {
            return false;
        }
        let slice = remaining.min(Duration::from_secs(1));
        sleep(slice).await;
        remaining = remaining.saturating_sub(slice);
    }
    !shutdown.load(Ordering::SeqCst)
}
