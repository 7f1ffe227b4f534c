//! moltbot
//!
//! An autonomous agent for the Moltbook feed: polls, sanitizes, satisfies
//! verification challenges, asks a decision engine how to participate,
//! validates the answer against ground truth, and executes within budget.

pub mod action;
pub mod challenge;
pub mod config;
pub mod defense;
pub mod engine;
pub mod heartbeat;
pub mod memory;
pub mod platform;
pub mod setup;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;
