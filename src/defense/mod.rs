//! Content Defense
//!
//! Everything scraped from the platform feed is untrusted. It passes
//! through the sanitizer before reaching any prompt or log.

pub mod sanitizer;

pub use sanitizer::sanitize_text;
