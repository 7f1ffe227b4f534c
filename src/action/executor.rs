//! Action Executor
//!
//! Runs accepted proposals strictly one at a time, each followed by a
//! randomized pause inside the configured band, staying under the
//! platform's per-action cooldown without a detectably mechanical
//! cadence. A suspension signal aborts whatever is left in the queue.

use chrono::{DateTime, Utc};
use rand::Rng;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use crate::heartbeat::gates::{CycleGates, DailyCounters};
use crate::memory::MemoryStore;
use crate::types::{ActionKind, BudgetConfig, DecisionPlan, MoltClient};

use super::validator::{validate_new_post, validate_proposal, CycleBudget, FeedIndex};

/// What actually happened while executing a plan.
#[derive(Clone, Debug, Default)]
pub struct ExecutionReport {
    pub upvotes: u32,
    pub comments: u32,
    pub replies: u32,
    pub posts: u32,
    pub rejected: u32,
    /// Set when execution stopped early because the account was suspended.
    pub aborted: Option<String>,
}

/// Execute a validated plan against the platform.
///
/// Memory is marked and daily counters bumped only on confirmed success;
/// a transient API failure skips that one action and continues.
pub async fn execute_plan(
    client: &dyn MoltClient,
    plan: &DecisionPlan,
    index: &FeedIndex,
    store: &mut MemoryStore,
    gates: &CycleGates,
    daily: &mut DailyCounters,
    limits: &BudgetConfig,
    now: DateTime<Utc>,
) -> ExecutionReport {
    let mut report = ExecutionReport::default();
    let mut budget = CycleBudget::default();

    for proposal in &plan.actions {
        if let Err(rejection) =
            validate_proposal(proposal, index, store, gates, &budget, daily, limits)
        {
            debug!(
                kind = ?proposal.kind,
                target = %proposal.target_post_id,
                %rejection,
                "proposal rejected"
            );
            report.rejected += 1;
            continue;
        }

        let post_id = proposal.target_post_id.as_str();
        match proposal.kind {
            ActionKind::Upvote => {
                let resp = client.upvote(post_id).await;
                if resp.health.is_suspended() {
                    report.aborted = suspension_reason(&resp.health);
                    break;
                }
                if resp.payload.is_some() {
                    budget.upvotes_used += 1;
                    report.upvotes += 1;
                    store.mark_interacted(post_id);
                    note_author(store, index, post_id, "upvoted", now);
                    info!(post_id, "upvoted");
                } else {
                    warn!(post_id, "upvote failed, skipping");
                }
            }
            ActionKind::Comment => {
                let text = proposal.text.as_deref().unwrap_or_default();
                let resp = client.create_comment(post_id, text, None).await;
                if resp.health.is_suspended() {
                    report.aborted = suspension_reason(&resp.health);
                    break;
                }
                if resp.payload.is_some() {
                    budget.engagements_used += 1;
                    daily.comments += 1;
                    report.comments += 1;
                    store.mark_interacted(post_id);
                    note_author(store, index, post_id, "engaged", now);
                    info!(post_id, "commented");
                } else {
                    warn!(post_id, "comment failed, skipping");
                }
            }
            ActionKind::Reply => {
                let text = proposal.text.as_deref().unwrap_or_default();
                // Validation guarantees the parent id is present and real.
                let parent = proposal.target_comment_id.as_deref().unwrap_or_default();
                let resp = client.create_comment(post_id, text, Some(parent)).await;
                if resp.health.is_suspended() {
                    report.aborted = suspension_reason(&resp.health);
                    break;
                }
                if resp.payload.is_some() {
                    budget.engagements_used += 1;
                    daily.comments += 1;
                    report.replies += 1;
                    store.mark_replied_to(parent);
                    store.mark_interacted(post_id);
                    note_author(store, index, post_id, "engaged", now);
                    info!(post_id, parent, "replied");
                } else {
                    warn!(post_id, "reply failed, skipping");
                }
            }
            ActionKind::Skip => {}
        }

        pace(limits).await;
    }

    if report.aborted.is_some() {
        return report;
    }

    if let Some(ref new_post) = plan.new_post {
        match validate_new_post(&store.memory, gates, daily, limits, now) {
            Ok(()) => {
                let resp = client
                    .create_post(&new_post.submolt, &new_post.title, &new_post.body)
                    .await;
                if resp.health.is_suspended() {
                    report.aborted = suspension_reason(&resp.health);
                    return report;
                }
                if resp.payload.is_some() {
                    daily.posts += 1;
                    report.posts += 1;
                    store.record_post_time(now);
                    info!(submolt = %new_post.submolt, title = %new_post.title, "posted");
                } else {
                    warn!("new post failed, skipping");
                }
            }
            Err(rejection) => {
                debug!(%rejection, "new post rejected");
                report.rejected += 1;
            }
        }
    }

    report
}

/// Sleep a random duration inside the configured jitter band. A
/// hand-edited config can invert the band; treat it as its bounds swapped
/// rather than panicking mid-cycle.
async fn pace(limits: &BudgetConfig) {
    let min = limits.min_action_delay_ms.min(limits.max_action_delay_ms);
    let max = limits.max_action_delay_ms.max(limits.min_action_delay_ms);
    if max == 0 {
        return;
    }
    let ms = rand::thread_rng().gen_range(min..=max);
    sleep(Duration::from_millis(ms)).await;
}

fn note_author(
    store: &mut MemoryStore,
    index: &FeedIndex,
    post_id: &str,
    sentiment: &str,
    now: DateTime<Utc>,
) {
    if let Some(author) = index.author_of(post_id) {
        let author = author.to_string();
        store.note_agent(&author, sentiment, "", now);
    }
}

fn suspension_reason(health: &crate::types::AccountHealth) -> Option<String> {
    match health {
        crate::types::AccountHealth::Suspended { reason } => Some(reason.clone()),
        crate::types::AccountHealth::Active => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingClient;
    use crate::types::{default_config, ActionProposal, FeedComment, FeedItem, NewPostProposal};

    fn feed() -> Vec<FeedItem> {
        vec![
            FeedItem {
                id: "p1".to_string(),
                title: "first".to_string(),
                body: String::new(),
                author: "alice".to_string(),
                submolt: "general".to_string(),
                upvotes: 0,
                downvotes: 0,
                comment_count: 1,
                created_at: String::new(),
                comments: vec![FeedComment {
                    id: "c1".to_string(),
                    author: "bob".to_string(),
                    body: "hi".to_string(),
                    created_at: String::new(),
                }],
            },
            FeedItem {
                id: "p2".to_string(),
                title: "second".to_string(),
                body: String::new(),
                author: "carol".to_string(),
                submolt: "general".to_string(),
                upvotes: 0,
                downvotes: 0,
                comment_count: 0,
                created_at: String::new(),
                comments: Vec::new(),
            },
        ]
    }

    fn fast_limits() -> crate::types::BudgetConfig {
        let mut limits = default_config().limits;
        limits.min_action_delay_ms = 0;
        limits.max_action_delay_ms = 0;
        limits
    }

    fn store() -> MemoryStore {
        MemoryStore::load(std::env::temp_dir().join(format!(
            "moltbot-executor-{}.json",
            uuid::Uuid::new_v4()
        )))
    }

    fn upvote(target: &str) -> ActionProposal {
        ActionProposal {
            kind: ActionKind::Upvote,
            target_post_id: target.to_string(),
            target_comment_id: None,
            text: None,
            rationale: None,
        }
    }

    #[tokio::test]
    async fn test_hallucinated_targets_never_reach_the_client() {
        let client = RecordingClient::new(feed());
        let plan = DecisionPlan {
            actions: vec![upvote("p_fake"), upvote("p1")],
            new_post: None,
            summary: String::new(),
        };
        let index = FeedIndex::build(&feed());
        let mut memory = store();
        let mut daily = DailyCounters::new(Utc::now());

        let report = execute_plan(
            &client,
            &plan,
            &index,
            &mut memory,
            &CycleGates::open(),
            &mut daily,
            &fast_limits(),
            Utc::now(),
        )
        .await;

        assert_eq!(report.upvotes, 1);
        assert_eq!(report.rejected, 1);
        let calls = client.calls();
        assert_eq!(calls, vec!["upvote:p1"]);
    }

    #[tokio::test]
    async fn test_suspension_aborts_remaining_queue() {
        let client = RecordingClient::new(feed()).suspend_writes("rule violation");
        let plan = DecisionPlan {
            actions: vec![upvote("p1"), upvote("p2")],
            new_post: Some(NewPostProposal {
                submolt: "general".to_string(),
                title: "t".to_string(),
                body: "b".to_string(),
            }),
            summary: String::new(),
        };
        let index = FeedIndex::build(&feed());
        let mut memory = store();
        let mut daily = DailyCounters::new(Utc::now());

        let report = execute_plan(
            &client,
            &plan,
            &index,
            &mut memory,
            &CycleGates::open(),
            &mut daily,
            &fast_limits(),
            Utc::now(),
        )
        .await;

        assert_eq!(report.aborted.as_deref(), Some("rule violation"));
        assert_eq!(report.upvotes, 0);
        assert_eq!(report.posts, 0);
        // only the first write was attempted
        assert_eq!(client.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_successful_reply_marks_memory_and_counters() {
        let client = RecordingClient::new(feed());
        let plan = DecisionPlan {
            actions: vec![ActionProposal {
                kind: ActionKind::Reply,
                target_post_id: "p1".to_string(),
                target_comment_id: Some("c1".to_string()),
                text: Some("good point".to_string()),
                rationale: None,
            }],
            new_post: None,
            summary: String::new(),
        };
        let index = FeedIndex::build(&feed());
        let mut memory = store();
        let mut daily = DailyCounters::new(Utc::now());

        let report = execute_plan(
            &client,
            &plan,
            &index,
            &mut memory,
            &CycleGates::open(),
            &mut daily,
            &fast_limits(),
            Utc::now(),
        )
        .await;

        assert_eq!(report.replies, 1);
        assert_eq!(daily.comments, 1);
        assert!(memory.has_replied_to("c1"));
        assert!(memory.has_interacted("p1"));
        assert_eq!(memory.memory.known_agents["alice"].interaction_count, 1);
    }

    #[tokio::test]
    async fn test_transient_failure_skips_without_abort() {
        let client = RecordingClient::new(feed()).fail_writes();
        let plan = DecisionPlan {
            actions: vec![upvote("p1"), upvote("p2")],
            new_post: None,
            summary: String::new(),
        };
        let index = FeedIndex::build(&feed());
        let mut memory = store();
        let mut daily = DailyCounters::new(Utc::now());

        let report = execute_plan(
            &client,
            &plan,
            &index,
            &mut memory,
            &CycleGates::open(),
            &mut daily,
            &fast_limits(),
            Utc::now(),
        )
        .await;

        assert!(report.aborted.is_none());
        assert_eq!(report.upvotes, 0);
        // both were still attempted; failure is per-action
        assert_eq!(client.calls().len(), 2);
        assert!(!memory.has_interacted("p1"));
    }
}
