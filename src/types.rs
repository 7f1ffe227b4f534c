//! Moltbot - Type Definitions
//!
//! Shared types for the feed agent: platform payloads, durable memory,
//! challenges, decision plans, and the collaborator traits.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ─── Configuration ───────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MoltbotConfig {
    pub agent_name: String,
    pub persona: String,
    pub api_url: String,
    pub api_key: String,
    pub engine_api_url: String,
    pub engine_api_key: String,
    pub engine_model: String,
    pub max_tokens_per_decision: u32,
    pub memory_path: String,
    pub log_level: LogLevel,
    /// Base heartbeat interval; the daemon applies +-30% jitter per cycle.
    pub heartbeat_interval_secs: u64,
    /// Interval used while the account is suspended.
    pub suspended_interval_secs: u64,
    pub feed_sort: String,
    pub feed_limit: u32,
    /// How many top feed posts get their comments fetched each cycle.
    pub enrich_top_posts: usize,
    /// Author handles whose challenges are treated as moderator-issued.
    pub moderator_handles: Vec<String>,
    /// When an obligatory challenge action fails at the API, still mark the
    /// post as interacted so it is never retried. Set to false to allow a
    /// retry on the next cycle instead.
    pub mark_challenge_handled_on_failure: bool,
    pub limits: BudgetConfig,
    pub gates: GateOdds,
    pub version: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BudgetConfig {
    pub max_upvotes_per_cycle: u32,
    /// Comments and replies share one per-cycle budget.
    pub max_engagements_per_cycle: u32,
    pub max_comments_per_day: u32,
    pub max_posts_per_day: u32,
    /// Minimum minutes between two own posts.
    pub min_post_interval_mins: i64,
    /// Jitter band for the delay between consecutive executed actions.
    pub min_action_delay_ms: u64,
    pub max_action_delay_ms: u64,
    pub max_challenges_per_cycle: usize,
    pub community_creation_weekly_cap: u32,
}

/// Per-cycle probability that each action category is attempted at all.
/// Values in [0,1]; sampled from the cycle seed, not from the engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GateOdds {
    pub comment: f64,
    pub reply: f64,
    pub post: f64,
    pub follow: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for MoltbotConfig {
    fn default() -> Self {
        default_config()
    }
}

impl Default for BudgetConfig {
    fn default() -> Self {
        default_config().limits
    }
}

impl Default for GateOdds {
    fn default() -> Self {
        default_config().gates
    }
}

/// Default config with operational fields filled in. Identity fields
/// (name, keys) are empty so `--init` can populate them.
pub fn default_config() -> MoltbotConfig {
    MoltbotConfig {
        agent_name: String::new(),
        persona: String::new(),
        api_url: "https://www.moltbook.com/api/v1".to_string(),
        api_key: String::new(),
        engine_api_url: "https://api.openai.com".to_string(),
        engine_api_key: String::new(),
        engine_model: "gpt-4o".to_string(),
        max_tokens_per_decision: 2048,
        memory_path: "~/.moltbot/memory.json".to_string(),
        log_level: LogLevel::Info,
        heartbeat_interval_secs: 1800,
        suspended_interval_secs: 14400,
        feed_sort: "hot".to_string(),
        feed_limit: 25,
        enrich_top_posts: 5,
        moderator_handles: vec!["moltbook".to_string(), "admin".to_string()],
        mark_challenge_handled_on_failure: true,
        limits: BudgetConfig {
            max_upvotes_per_cycle: 5,
            max_engagements_per_cycle: 3,
            max_comments_per_day: 20,
            max_posts_per_day: 3,
            min_post_interval_mins: 120,
            min_action_delay_ms: 4_000,
            max_action_delay_ms: 12_000,
            max_challenges_per_cycle: 2,
            community_creation_weekly_cap: 1,
        },
        gates: GateOdds {
            comment: 0.8,
            reply: 0.7,
            post: 0.3,
            follow: 0.4,
        },
        version: "0.1.0".to_string(),
    }
}

// ─── Feed ────────────────────────────────────────────────────────

/// One post from the platform feed. The id is opaque, platform-assigned,
/// unique within a fetch, and the only legal target for any action.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    pub id: String,
    pub title: String,
    pub body: String,
    pub author: String,
    pub submolt: String,
    pub upvotes: i64,
    pub downvotes: i64,
    pub comment_count: u64,
    pub created_at: String,
    #[serde(default)]
    pub comments: Vec<FeedComment>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedComment {
    pub id: String,
    pub author: String,
    pub body: String,
    pub created_at: String,
}

// ─── Memory ──────────────────────────────────────────────────────

/// The durable cross-cycle record. Every field defaults so an older or
/// hand-edited document loads without failing.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Memory {
    pub interacted_post_ids: Vec<String>,
    pub interacted_comment_ids: Vec<String>,
    pub followed_agents: Vec<FollowRecord>,
    pub subscribed_communities: Vec<CommunityRecord>,
    pub created_communities: Vec<CommunityRecord>,
    pub known_agents: HashMap<String, AgentNote>,
    pub topic_performance: HashMap<String, TopicStats>,
    pub journal: Vec<JournalEntry>,
    pub last_heartbeat_time: Option<String>,
    pub total_heartbeats: u64,
    pub last_post_time: Option<String>,
    /// `YYYY-MM-DD` of the last community sweep; gates it to once a day.
    pub last_community_check_day: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowRecord {
    pub name: String,
    pub followed_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityRecord {
    pub name: String,
    pub timestamp: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentNote {
    pub last_seen: String,
    pub note: String,
    pub sentiment: String,
    pub interaction_count: u32,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TopicStats {
    pub post_count: u32,
    pub total_upvotes: i64,
    pub total_comments: u64,
}

/// One cycle's outcome, appended to the bounded journal.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JournalEntry {
    pub cycle_id: String,
    pub timestamp: String,
    pub summary: String,
    pub upvotes_given: u32,
    pub comments_made: u32,
    pub replies_made: u32,
    pub posts_made: u32,
    pub follows_made: u32,
    pub subscriptions_made: u32,
    pub challenges_completed: u32,
}

// ─── Sanitizer ───────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SanitizedText {
    pub clean: String,
    pub flagged: bool,
    pub redactions: usize,
}

// ─── Challenges ──────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeAction {
    Upvote,
    Comment,
    Follow,
}

/// A platform-issued "prove you are a real agent" obligation, derived
/// fresh from each fetch. Never persisted; only its effects are recorded.
#[derive(Clone, Debug)]
pub struct Challenge {
    pub target_post_id: String,
    pub required_actions: Vec<ChallengeAction>,
    pub confidence: f64,
    pub source_author: String,
    pub from_moderator: bool,
}

// ─── Decision Plan ───────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Upvote,
    Comment,
    Reply,
    Skip,
}

/// An action suggested by the decision engine. Structurally trusted,
/// target identifiers untrusted until validated against the live feed.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionProposal {
    pub kind: ActionKind,
    pub target_post_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_comment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPostProposal {
    pub submolt: String,
    pub title: String,
    pub body: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DecisionPlan {
    pub actions: Vec<ActionProposal>,
    pub new_post: Option<NewPostProposal>,
    pub summary: String,
}

// ─── Account Health ──────────────────────────────────────────────

/// Whether the account is in good standing, as observed on the most
/// recent platform call. Threaded explicitly through the cycle rather
/// than cached inside the client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccountHealth {
    Active,
    Suspended { reason: String },
}

impl AccountHealth {
    pub fn is_suspended(&self) -> bool {
        matches!(self, AccountHealth::Suspended { .. })
    }
}

/// Result of a platform call: an optional payload (None on any failure)
/// plus the account health observed while making it. The client never
/// returns errors past this boundary.
#[derive(Clone, Debug)]
pub struct ApiResponse<T> {
    pub payload: Option<T>,
    pub health: AccountHealth,
}

impl<T> ApiResponse<T> {
    pub fn ok(payload: T) -> Self {
        Self {
            payload: Some(payload),
            health: AccountHealth::Active,
        }
    }

    /// A failed call that did not indicate suspension.
    pub fn missing() -> Self {
        Self {
            payload: None,
            health: AccountHealth::Active,
        }
    }

    pub fn suspended(reason: impl Into<String>) -> Self {
        Self {
            payload: None,
            health: AccountHealth::Suspended {
                reason: reason.into(),
            },
        }
    }
}

// ─── Platform Payloads ───────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountStatus {
    pub name: String,
    pub karma: i64,
    pub follower_count: u64,
    pub following_count: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnProfile {
    pub name: String,
    pub description: String,
    pub created_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityInfo {
    pub name: String,
    pub title: String,
    pub description: String,
    pub subscriber_count: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunitySpec {
    pub name: String,
    pub title: String,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchKind {
    Posts,
    Agents,
}

#[derive(Clone, Debug, Default)]
pub struct SearchResults {
    pub posts: Vec<FeedItem>,
    pub agents: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResult {
    pub api_key: String,
    pub agent_name: String,
}

// ─── Platform Client Interface ───────────────────────────────────

/// The platform API collaborator. Every operation returns a payload or a
/// null sentinel plus the observed account health; nothing here panics or
/// returns an error to the caller. Rate limits and generic failures both
/// degrade to the sentinel, distinguished only in the log.
#[async_trait]
pub trait MoltClient: Send + Sync {
    async fn register(&self, name: &str, description: &str) -> ApiResponse<RegistrationResult>;
    async fn get_account_status(&self) -> ApiResponse<AccountStatus>;
    async fn get_own_profile(&self) -> ApiResponse<OwnProfile>;
    async fn get_feed(&self, sort: &str, limit: u32) -> ApiResponse<Vec<FeedItem>>;
    async fn get_comments(&self, post_id: &str, sort: &str) -> ApiResponse<Vec<FeedComment>>;
    async fn create_post(&self, submolt: &str, title: &str, body: &str) -> ApiResponse<String>;
    async fn create_comment(
        &self,
        post_id: &str,
        text: &str,
        parent_id: Option<&str>,
    ) -> ApiResponse<String>;
    async fn upvote(&self, post_id: &str) -> ApiResponse<()>;
    async fn follow(&self, agent_name: &str) -> ApiResponse<()>;
    async fn list_communities(&self) -> ApiResponse<Vec<CommunityInfo>>;
    async fn subscribe(&self, community: &str) -> ApiResponse<()>;
    async fn create_community(&self, spec: &CommunitySpec) -> ApiResponse<()>;
    async fn search(&self, query: &str, kind: SearchKind, limit: u32)
        -> ApiResponse<SearchResults>;
}

// ─── Decision Engine Interface ───────────────────────────────────

/// Counters handed to the decision engine so it can pace itself;
/// the validator enforces the real budgets regardless.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySnapshot {
    pub comments_today: u32,
    pub posts_today: u32,
    pub total_heartbeats: u64,
}

/// The external text-generation collaborator. Returns the raw completion
/// text; `engine::parse` turns it into a `DecisionPlan`.
#[async_trait]
pub trait DecisionEngine: Send + Sync {
    async fn decide(
        &self,
        digest: &str,
        briefing: &str,
        activity: &ActivitySnapshot,
    ) -> anyhow::Result<String>;
}
