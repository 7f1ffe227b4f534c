//! Heartbeat Cycle
//!
//! One full pass of the agent loop: account status, suspension check,
//! feed fetch, sanitization, obligatory challenges, the engine decision,
//! validated execution, social upkeep, journal persist. Errors never
//! escape this module; every cycle ends cleanly so the daemon can
//! schedule the next one regardless of how this one went.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rand::Rng;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::action::{execute_plan, FeedIndex};
use crate::challenge::detect_challenges;
use crate::defense::sanitize_text;
use crate::engine::{build_feed_digest, parse_plan};
use crate::memory::{build_briefing, MemoryStore};
use crate::types::{
    AccountHealth, ActivitySnapshot, Challenge, ChallengeAction, CommunitySpec, DecisionEngine,
    FeedItem, JournalEntry, MoltClient, MoltbotConfig, SearchKind, TopicStats,
};

use super::gates::{CycleGates, DailyCounters};

/// Text posted when a challenge demands a comment. Challenges are
/// satisfied by literal API actions, not by prose, so this stays fixed.
const CHALLENGE_ACK: &str = "Acknowledged. Acting on it directly.";

/// How many of the agent's own posts the topic refresh re-queries.
const TOPIC_REFRESH_LIMIT: u32 = 25;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CyclePhase {
    FetchingStatus,
    CheckingSuspension,
    FetchingFeed,
    ExecutingChallenges,
    AwaitingDecision,
    ValidatingAndExecuting,
    HandlingSocialActions,
    PersistingJournal,
}

impl CyclePhase {
    fn name(self) -> &'static str {
        match self {
            CyclePhase::FetchingStatus => "fetching_status",
            CyclePhase::CheckingSuspension => "checking_suspension",
            CyclePhase::FetchingFeed => "fetching_feed",
            CyclePhase::ExecutingChallenges => "executing_challenges",
            CyclePhase::AwaitingDecision => "awaiting_decision",
            CyclePhase::ValidatingAndExecuting => "validating_and_executing",
            CyclePhase::HandlingSocialActions => "handling_social_actions",
            CyclePhase::PersistingJournal => "persisting_journal",
        }
    }
}

fn enter(phase: CyclePhase) {
    debug!(phase = phase.name(), "cycle phase");
}

/// What the daemon needs to know about a finished cycle.
#[derive(Clone, Debug)]
pub struct CycleOutcome {
    /// Set when the account was observed suspended at any point.
    pub suspended: Option<String>,
    pub summary: String,
}

/// Run one heartbeat cycle. Never returns an error: every failure mode
/// degrades to a journal entry and a clean return.
pub async fn run_cycle(
    client: &dyn MoltClient,
    engine: &dyn DecisionEngine,
    store: &mut MemoryStore,
    daily: &mut DailyCounters,
    config: &MoltbotConfig,
    seed: u64,
    now: DateTime<Utc>,
) -> CycleOutcome {
    daily.roll_over(now);
    let gates = CycleGates::from_seed(seed, &config.gates);
    let mut entry = JournalEntry {
        cycle_id: Uuid::new_v4().to_string(),
        timestamp: now.to_rfc3339(),
        ..Default::default()
    };
    info!(cycle_id = %entry.cycle_id, "heartbeat cycle starting");

    // ─── Status & suspension ─────────────────────────────────────

    enter(CyclePhase::FetchingStatus);
    let status = client.get_account_status().await;

    enter(CyclePhase::CheckingSuspension);
    if let AccountHealth::Suspended { reason } = status.health {
        warn!(%reason, "account suspended, skipping cycle");
        entry.summary = format!("account suspended: {reason}");
        let summary = entry.summary.clone();
        finish(store, entry, now);
        return CycleOutcome {
            suspended: Some(reason),
            summary,
        };
    }
    match status.payload {
        Some(ref s) => debug!(karma = s.karma, followers = s.follower_count, "account status"),
        None => warn!("account status unavailable, continuing"),
    }

    // ─── Feed ────────────────────────────────────────────────────

    enter(CyclePhase::FetchingFeed);
    let feed_resp = client.get_feed(&config.feed_sort, config.feed_limit).await;
    if let AccountHealth::Suspended { reason } = feed_resp.health {
        entry.summary = format!("account suspended: {reason}");
        let summary = entry.summary.clone();
        finish(store, entry, now);
        return CycleOutcome {
            suspended: Some(reason),
            summary,
        };
    }
    let Some(raw_feed) = feed_resp.payload else {
        entry.summary = "feed unavailable, nothing attempted".to_string();
        let summary = entry.summary.clone();
        finish(store, entry, now);
        return CycleOutcome {
            suspended: None,
            summary,
        };
    };

    let mut feed = sanitize_feed(raw_feed);

    // ─── Challenges ──────────────────────────────────────────────

    enter(CyclePhase::ExecutingChallenges);
    let challenges = detect_challenges(&feed, &config.moderator_handles);
    if !challenges.is_empty() {
        info!(count = challenges.len(), "challenges detected");
    }

    let pending: Vec<Challenge> = challenges
        .iter()
        .filter(|c| !store.has_interacted(&c.target_post_id))
        .take(config.limits.max_challenges_per_cycle)
        .cloned()
        .collect();

    for challenge in &pending {
        match execute_challenge(client, challenge, store, config).await {
            ChallengeResult::Completed => entry.challenges_completed += 1,
            ChallengeResult::Failed => {}
            ChallengeResult::Suspended(reason) => {
                entry.summary = format!("account suspended: {reason}");
                let summary = entry.summary.clone();
                finish(store, entry, now);
                return CycleOutcome {
                    suspended: Some(reason),
                    summary,
                };
            }
        }
    }
    if !pending.is_empty() {
        // Persist now so a later failure in this cycle cannot cause an
        // obligatory action to run twice.
        store.persist();
    }

    // The engine must never see a challenge, handled or not.
    let challenge_ids: HashSet<&str> = challenges
        .iter()
        .map(|c| c.target_post_id.as_str())
        .collect();
    feed.retain(|item| !challenge_ids.contains(item.id.as_str()));

    // ─── Enrichment ──────────────────────────────────────────────

    if let Some(reason) = enrich_feed(client, &mut feed, config).await {
        entry.summary = format!("account suspended: {reason}");
        let summary = entry.summary.clone();
        finish(store, entry, now);
        return CycleOutcome {
            suspended: Some(reason),
            summary,
        };
    }

    // ─── Decision ────────────────────────────────────────────────

    enter(CyclePhase::AwaitingDecision);
    let digest = build_feed_digest(&feed);
    let briefing = build_briefing(&store.memory);
    let activity = ActivitySnapshot {
        comments_today: daily.comments,
        posts_today: daily.posts,
        total_heartbeats: store.memory.total_heartbeats,
    };

    let plan = match engine.decide(&digest, &briefing, &activity).await {
        Ok(raw) => parse_plan(&raw),
        Err(e) => {
            warn!("decision engine call failed: {e:#}");
            None
        }
    };
    let Some(plan) = plan else {
        entry.summary = "decision engine produced no usable plan".to_string();
        let summary = entry.summary.clone();
        finish(store, entry, now);
        return CycleOutcome {
            suspended: None,
            summary,
        };
    };
    debug!(
        actions = plan.actions.len(),
        new_post = plan.new_post.is_some(),
        "plan parsed"
    );

    // ─── Execution ───────────────────────────────────────────────

    enter(CyclePhase::ValidatingAndExecuting);
    let index = FeedIndex::build(&feed);
    let report = execute_plan(
        client,
        &plan,
        &index,
        store,
        &gates,
        daily,
        &config.limits,
        now,
    )
    .await;
    entry.upvotes_given = report.upvotes;
    entry.comments_made = report.comments;
    entry.replies_made = report.replies;
    entry.posts_made = report.posts;

    if let Some(reason) = report.aborted {
        entry.summary = format!("account suspended mid-execution: {reason}");
        let summary = entry.summary.clone();
        finish(store, entry, now);
        return CycleOutcome {
            suspended: Some(reason),
            summary,
        };
    }

    // ─── Social upkeep ───────────────────────────────────────────

    enter(CyclePhase::HandlingSocialActions);
    if let Some(reason) = handle_social(client, store, &gates, config, &mut entry, now).await {
        entry.summary = format!("account suspended: {reason}");
        let summary = entry.summary.clone();
        finish(store, entry, now);
        return CycleOutcome {
            suspended: Some(reason),
            summary,
        };
    }

    // ─── Journal ─────────────────────────────────────────────────

    entry.summary = if plan.summary.is_empty() {
        format!(
            "cycle complete: {} upvotes, {} comments, {} replies, {} posts, {} challenges",
            entry.upvotes_given,
            entry.comments_made,
            entry.replies_made,
            entry.posts_made,
            entry.challenges_completed,
        )
    } else {
        plan.summary.clone()
    };
    let summary = entry.summary.clone();
    info!(cycle_id = %entry.cycle_id, %summary, "heartbeat cycle finished");
    finish(store, entry, now);

    CycleOutcome {
        suspended: None,
        summary,
    }
}

/// Journal, heartbeat counter, persist. Every exit path funnels through
/// here so no cycle ends without a durable record.
fn finish(store: &mut MemoryStore, entry: JournalEntry, now: DateTime<Utc>) {
    enter(CyclePhase::PersistingJournal);
    store.push_journal(entry);
    store.record_heartbeat(now);
    store.persist();
}

/// Run every title, body, and comment through the sanitizer before any
/// other component sees the feed.
fn sanitize_feed(raw: Vec<FeedItem>) -> Vec<FeedItem> {
    let mut flagged = 0usize;
    let feed = raw
        .into_iter()
        .map(|mut item| {
            let title = sanitize_text(&item.title);
            let body = sanitize_text(&item.body);
            if title.flagged || body.flagged {
                flagged += 1;
            }
            item.title = title.clean;
            item.body = body.clean;
            for comment in &mut item.comments {
                let clean = sanitize_text(&comment.body);
                if clean.flagged {
                    flagged += 1;
                }
                comment.body = clean.clean;
            }
            item
        })
        .collect();
    if flagged > 0 {
        warn!(flagged, "feed items carried filtered content");
    }
    feed
}

enum ChallengeResult {
    Completed,
    Failed,
    Suspended(String),
}

/// Satisfy one challenge with direct API calls. Whether a failed attempt
/// still counts as handled is the `mark_challenge_handled_on_failure` knob.
async fn execute_challenge(
    client: &dyn MoltClient,
    challenge: &Challenge,
    store: &mut MemoryStore,
    config: &MoltbotConfig,
) -> ChallengeResult {
    let post_id = challenge.target_post_id.as_str();
    info!(
        post_id,
        author = %challenge.source_author,
        confidence = challenge.confidence,
        actions = challenge.required_actions.len(),
        "executing challenge"
    );

    let mut all_succeeded = true;
    for action in &challenge.required_actions {
        let resp_health;
        let succeeded;
        match action {
            ChallengeAction::Upvote => {
                let resp = client.upvote(post_id).await;
                succeeded = resp.payload.is_some();
                resp_health = resp.health;
            }
            ChallengeAction::Comment => {
                let resp = client.create_comment(post_id, CHALLENGE_ACK, None).await;
                succeeded = resp.payload.is_some();
                resp_health = resp.health;
            }
            ChallengeAction::Follow => {
                let resp = client.follow(&challenge.source_author).await;
                succeeded = resp.payload.is_some();
                resp_health = resp.health;
            }
        }
        if let AccountHealth::Suspended { reason } = resp_health {
            return ChallengeResult::Suspended(reason);
        }
        if !succeeded {
            warn!(post_id, ?action, "challenge action failed");
            all_succeeded = false;
        }
        jitter_sleep(
            config.limits.min_action_delay_ms,
            config.limits.max_action_delay_ms,
        )
        .await;
    }

    if all_succeeded || config.mark_challenge_handled_on_failure {
        store.mark_interacted(post_id);
    }
    if all_succeeded {
        ChallengeResult::Completed
    } else {
        ChallengeResult::Failed
    }
}

/// Fetch and sanitize comments for the top posts so the engine can see
/// conversation context and replies have real parent ids to target.
/// Returns a suspension reason if one surfaces mid-enrichment.
async fn enrich_feed(
    client: &dyn MoltClient,
    feed: &mut [FeedItem],
    config: &MoltbotConfig,
) -> Option<String> {
    let mut enriched = 0usize;
    for item in feed.iter_mut() {
        if enriched >= config.enrich_top_posts {
            break;
        }
        if item.comment_count == 0 || !item.comments.is_empty() {
            continue;
        }
        let resp = client.get_comments(&item.id, "top").await;
        if let AccountHealth::Suspended { reason } = resp.health {
            return Some(reason);
        }
        if let Some(comments) = resp.payload {
            item.comments = comments
                .into_iter()
                .map(|mut c| {
                    c.body = sanitize_text(&c.body).clean;
                    c
                })
                .collect();
        }
        enriched += 1;
        // Reads still get a pause, just a shorter one than writes.
        jitter_sleep(
            config.limits.min_action_delay_ms / 4,
            config.limits.max_action_delay_ms / 4,
        )
        .await;
    }
    None
}

/// The cadence-gated extras: follow one well-known author per trailing
/// week, a once-a-day community sweep, and the topic performance refresh.
async fn handle_social(
    client: &dyn MoltClient,
    store: &mut MemoryStore,
    gates: &CycleGates,
    config: &MoltbotConfig,
    entry: &mut JournalEntry,
    now: DateTime<Utc>,
) -> Option<String> {
    if gates.follows && store.can_follow_this_week(now) {
        if let Some(candidate) = follow_candidate(store) {
            let resp = client.follow(&candidate).await;
            if let AccountHealth::Suspended { reason } = resp.health {
                return Some(reason);
            }
            if resp.payload.is_some() {
                store.mark_followed(&candidate, now);
                entry.follows_made += 1;
                info!(agent = %candidate, "followed");
            }
        }
    }

    if store.should_check_communities(now) {
        store.mark_communities_checked(now);
        if let Some(reason) = community_sweep(client, store, config, entry, now).await {
            return Some(reason);
        }
    }

    if !config.agent_name.is_empty() {
        let resp = client
            .search(&config.agent_name, SearchKind::Posts, TOPIC_REFRESH_LIMIT)
            .await;
        if let AccountHealth::Suspended { reason } = resp.health {
            return Some(reason);
        }
        if let Some(results) = resp.payload {
            let own: Vec<&FeedItem> = results
                .posts
                .iter()
                .filter(|p| p.author.eq_ignore_ascii_case(&config.agent_name))
                .collect();
            let mut stats: std::collections::HashMap<String, TopicStats> =
                std::collections::HashMap::new();
            for post in own {
                let topic = stats.entry(post.submolt.clone()).or_default();
                topic.post_count += 1;
                topic.total_upvotes += post.upvotes;
                topic.total_comments += post.comment_count;
            }
            store.refresh_topic_performance(stats);
        }
    }

    None
}

/// The most-interacted-with agent not yet followed, needing at least two
/// recorded interactions before a follow is worth spending the weekly slot.
fn follow_candidate(store: &MemoryStore) -> Option<String> {
    store
        .memory
        .known_agents
        .iter()
        .filter(|(name, note)| note.interaction_count >= 2 && !store.has_followed(name))
        .max_by_key(|(_, note)| note.interaction_count)
        .map(|(name, _)| name.clone())
}

/// Subscribe to at most one new community per sweep; create one only when
/// a topic has proven itself and nothing similar already exists.
async fn community_sweep(
    client: &dyn MoltClient,
    store: &mut MemoryStore,
    config: &MoltbotConfig,
    entry: &mut JournalEntry,
    now: DateTime<Utc>,
) -> Option<String> {
    let resp = client.list_communities().await;
    if let AccountHealth::Suspended { reason } = resp.health {
        return Some(reason);
    }
    let Some(communities) = resp.payload else {
        return None;
    };

    let unjoined = communities.iter().find(|c| {
        !store
            .memory
            .subscribed_communities
            .iter()
            .any(|s| s.name == c.name)
    });
    if let Some(community) = unjoined {
        let resp = client.subscribe(&community.name).await;
        if let AccountHealth::Suspended { reason } = resp.health {
            return Some(reason);
        }
        if resp.payload.is_some() {
            store.record_subscription(&community.name, now);
            entry.subscriptions_made += 1;
            info!(community = %community.name, "subscribed");
        }
    }

    if !store.can_create_community_this_week(now, config.limits.community_creation_weekly_cap) {
        return None;
    }
    // A topic qualifies once the agent has posted there a few times with
    // something to show for it.
    let hot_topic = store
        .memory
        .topic_performance
        .iter()
        .filter(|(_, s)| s.post_count >= 3 && s.total_upvotes + 2 * s.total_comments as i64 >= 10)
        .max_by_key(|(_, s)| s.total_upvotes + 2 * s.total_comments as i64)
        .map(|(topic, _)| topic.clone());
    if let Some(topic) = hot_topic {
        let name = format!("{topic}hub");
        let taken = communities
            .iter()
            .any(|c| c.name.contains(&topic) || topic.contains(&c.name));
        if !taken {
            let spec = CommunitySpec {
                name: name.clone(),
                title: format!("All things {topic}"),
                description: format!("A place for agents working on {topic}."),
            };
            let resp = client.create_community(&spec).await;
            if let AccountHealth::Suspended { reason } = resp.health {
                return Some(reason);
            }
            if resp.payload.is_some() {
                store.record_community_created(&name, now);
                info!(community = %name, "community created");
            }
        }
    }

    None
}

// An inverted band from a hand-edited config is treated as its bounds
// swapped; gen_range panics on an empty range otherwise.
async fn jitter_sleep(min_ms: u64, max_ms: u64) {
    let (min_ms, max_ms) = (min_ms.min(max_ms), max_ms.max(min_ms));
    if max_ms == 0 {
        return;
    }
    let ms = rand::thread_rng().gen_range(min_ms..=max_ms);
    sleep(Duration::from_millis(ms)).await;
}
