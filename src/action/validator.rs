//! Action Validator & Rate Limiter
//!
//! Every proposal from the decision engine is checked here before
//! execution: its target must exist in the just-fetched feed (engines
//! hallucinate identifiers), it must not duplicate past work recorded in
//! memory, and it must fit the per-cycle and per-day budgets.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::heartbeat::gates::{CycleGates, DailyCounters};
use crate::memory::MemoryStore;
use crate::types::{ActionKind, ActionProposal, BudgetConfig, FeedItem, Memory};

/// Ground truth for one cycle: the identifiers that actually exist in
/// the enriched fetch. Anything else is not a legal target.
pub struct FeedIndex {
    post_ids: HashSet<String>,
    comment_ids_by_post: HashMap<String, HashSet<String>>,
    authors_by_post: HashMap<String, String>,
}

impl FeedIndex {
    pub fn build(feed: &[FeedItem]) -> Self {
        let mut post_ids = HashSet::new();
        let mut comment_ids_by_post: HashMap<String, HashSet<String>> = HashMap::new();
        let mut authors_by_post = HashMap::new();

        for item in feed {
            post_ids.insert(item.id.clone());
            authors_by_post.insert(item.id.clone(), item.author.clone());
            let comments = comment_ids_by_post.entry(item.id.clone()).or_default();
            for comment in &item.comments {
                comments.insert(comment.id.clone());
            }
        }

        Self {
            post_ids,
            comment_ids_by_post,
            authors_by_post,
        }
    }

    pub fn has_post(&self, post_id: &str) -> bool {
        self.post_ids.contains(post_id)
    }

    /// The parent comment must belong to that exact post.
    pub fn has_comment(&self, post_id: &str, comment_id: &str) -> bool {
        self.comment_ids_by_post
            .get(post_id)
            .map(|set| set.contains(comment_id))
            .unwrap_or(false)
    }

    pub fn author_of(&self, post_id: &str) -> Option<&str> {
        self.authors_by_post.get(post_id).map(|s| s.as_str())
    }
}

/// Per-cycle consumption, checked against `BudgetConfig` ceilings.
#[derive(Clone, Copy, Debug, Default)]
pub struct CycleBudget {
    pub upvotes_used: u32,
    pub engagements_used: u32,
}

#[derive(Debug, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("target post not present in the fetched feed")]
    UnknownPost,
    #[error("parent comment not present on that post")]
    UnknownComment,
    #[error("post already interacted with")]
    AlreadyInteracted,
    #[error("comment already replied to")]
    AlreadyReplied,
    #[error("per-cycle budget exhausted")]
    CycleBudget,
    #[error("per-day budget exhausted")]
    DailyBudget,
    #[error("post cooldown has not elapsed")]
    PostCooldown,
    #[error("action requires text but none was provided")]
    MissingText,
    #[error("category gated off this cycle")]
    GatedOff,
    #[error("skip requested")]
    Skip,
}

/// Validate one proposal against ground truth, memory, gates, and budgets.
pub fn validate_proposal(
    proposal: &ActionProposal,
    index: &FeedIndex,
    store: &MemoryStore,
    gates: &CycleGates,
    budget: &CycleBudget,
    daily: &DailyCounters,
    limits: &BudgetConfig,
) -> Result<(), Rejection> {
    if proposal.kind == ActionKind::Skip {
        return Err(Rejection::Skip);
    }

    if !index.has_post(&proposal.target_post_id) {
        return Err(Rejection::UnknownPost);
    }

    match proposal.kind {
        ActionKind::Upvote => {
            if store.has_interacted(&proposal.target_post_id) {
                return Err(Rejection::AlreadyInteracted);
            }
            if budget.upvotes_used >= limits.max_upvotes_per_cycle {
                return Err(Rejection::CycleBudget);
            }
        }
        ActionKind::Comment => {
            if !gates.comments {
                return Err(Rejection::GatedOff);
            }
            if proposal.text.as_deref().unwrap_or("").trim().is_empty() {
                return Err(Rejection::MissingText);
            }
            if store.has_interacted(&proposal.target_post_id) {
                return Err(Rejection::AlreadyInteracted);
            }
            if budget.engagements_used >= limits.max_engagements_per_cycle {
                return Err(Rejection::CycleBudget);
            }
            if daily.comments >= limits.max_comments_per_day {
                return Err(Rejection::DailyBudget);
            }
        }
        ActionKind::Reply => {
            if !gates.replies {
                return Err(Rejection::GatedOff);
            }
            if proposal.text.as_deref().unwrap_or("").trim().is_empty() {
                return Err(Rejection::MissingText);
            }
            let comment_id = proposal
                .target_comment_id
                .as_deref()
                .ok_or(Rejection::UnknownComment)?;
            if !index.has_comment(&proposal.target_post_id, comment_id) {
                return Err(Rejection::UnknownComment);
            }
            if store.has_replied_to(comment_id) {
                return Err(Rejection::AlreadyReplied);
            }
            if budget.engagements_used >= limits.max_engagements_per_cycle {
                return Err(Rejection::CycleBudget);
            }
            if daily.comments >= limits.max_comments_per_day {
                return Err(Rejection::DailyBudget);
            }
        }
        ActionKind::Skip => unreachable!("handled above"),
    }

    Ok(())
}

/// Validate the optional new-post proposal: gated, daily-capped, and
/// subject to a minimum cooldown since the last successful post.
pub fn validate_new_post(
    memory: &Memory,
    gates: &CycleGates,
    daily: &DailyCounters,
    limits: &BudgetConfig,
    now: DateTime<Utc>,
) -> Result<(), Rejection> {
    if !gates.posts {
        return Err(Rejection::GatedOff);
    }
    if daily.posts >= limits.max_posts_per_day {
        return Err(Rejection::DailyBudget);
    }
    if let Some(ref last) = memory.last_post_time {
        if let Ok(last) = DateTime::parse_from_rfc3339(last) {
            let elapsed = now.signed_duration_since(last.with_timezone(&Utc));
            if elapsed < Duration::minutes(limits.min_post_interval_mins) {
                return Err(Rejection::PostCooldown);
            }
        }
    }
    Ok(())
}
