//! Cycle Gates & Daily Counters
//!
//! Two small state objects the orchestrator owns: the probabilistic
//! per-cycle damper that decides which action categories are even
//! attempted (independently of the decision engine, to defeat cadence
//! fingerprinting), and the per-day counters that back the daily budgets.

use chrono::{DateTime, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::types::GateOdds;

/// Which action categories this cycle will attempt at all. Derived from
/// an explicit seed so a cycle can be replayed deterministically under
/// test.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CycleGates {
    pub comments: bool,
    pub replies: bool,
    pub posts: bool,
    pub follows: bool,
}

impl CycleGates {
    pub fn from_seed(seed: u64, odds: &GateOdds) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        Self {
            comments: rng.gen_bool(odds.comment.clamp(0.0, 1.0)),
            replies: rng.gen_bool(odds.reply.clamp(0.0, 1.0)),
            posts: rng.gen_bool(odds.post.clamp(0.0, 1.0)),
            follows: rng.gen_bool(odds.follow.clamp(0.0, 1.0)),
        }
    }

    /// Everything allowed; used when a test needs the gates out of the way.
    pub fn open() -> Self {
        Self {
            comments: true,
            replies: true,
            posts: true,
            follows: true,
        }
    }
}

/// Posts/comments written today, outside persisted memory. Owned by the
/// orchestrator and passed by reference into execution; reset when the
/// UTC date rolls over.
#[derive(Clone, Debug)]
pub struct DailyCounters {
    pub day: NaiveDate,
    pub comments: u32,
    pub posts: u32,
}

impl DailyCounters {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            day: now.date_naive(),
            comments: 0,
            posts: 0,
        }
    }

    /// Reset the counters when `now` is on a later date than they track.
    pub fn roll_over(&mut self, now: DateTime<Utc>) {
        let today = now.date_naive();
        if today != self.day {
            self.day = today;
            self.comments = 0;
            self.posts = 0;
        }
    }
}
