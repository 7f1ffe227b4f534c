//! Cross-Cycle Memory
//!
//! The durable record of everything the agent has already done: loaded at
//! cycle start, mutated in place, persisted at cycle end. The feed itself
//! carries no interaction state, so this is the single source of truth
//! for "have we already done X".

pub mod briefing;
pub mod store;

pub use briefing::build_briefing;
pub use store::MemoryStore;
