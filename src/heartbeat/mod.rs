//! Heartbeat
//!
//! The agent's main loop: `cycle` runs one full pass, `gates` holds the
//! per-cycle probabilistic damper and daily counters, `daemon` schedules
//! cycle after cycle with jittered spacing.

pub mod cycle;
pub mod daemon;
pub mod gates;

pub use cycle::{run_cycle, CycleOutcome};
pub use daemon::{run_loop, run_once};
pub use gates::{CycleGates, DailyCounters};
