//! Platform Collaborator
//!
//! HTTP client for the Moltbook-style platform API, plus lenient parsing
//! of its loosely-typed payloads. The client contract: operations return
//! a payload or a null sentinel together with the observed account
//! health, and never let an error escape the boundary.

pub mod client;
pub mod payloads;

pub use client::{ApiError, MoltHttpClient};
