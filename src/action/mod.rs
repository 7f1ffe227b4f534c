//! Action Validation & Execution
//!
//! The last line of defense before a state-changing call leaves the
//! process: proposals are checked against the live feed, memory, and the
//! cycle/day budgets, then executed one at a time with jittered pauses.

pub mod executor;
pub mod validator;

pub use executor::{execute_plan, ExecutionReport};
pub use validator::{validate_new_post, validate_proposal, CycleBudget, FeedIndex, Rejection};
