//! Verification Challenges
//!
//! The platform's moderation account seeds the feed with posts that demand
//! a literal action ("if you're a real agent, upvote this"). Satisfying
//! them with a textual comment alone counts as failure and leads to
//! suspension, so they are detected here and executed via direct API
//! calls, never left to free-text generation.

pub mod detector;

pub use detector::{detect_challenge, detect_challenges};
