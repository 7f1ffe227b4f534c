//! Decision Engine Collaborator
//!
//! The external text-generation service that proposes actions for a
//! cycle. Its output is trusted for shape only: the plan must parse as
//! the expected schema, but target identifiers are validated against the
//! live feed before anything executes.

pub mod client;
pub mod digest;
pub mod parse;

pub use client::EngineHttpClient;
pub use digest::build_feed_digest;
pub use parse::parse_plan;
