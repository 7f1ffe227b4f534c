//! Memory Store
//!
//! JSON-file backed persistence for the `Memory` record, with FIFO bounds
//! on every collection and the cadence gates the orchestrator consults.
//! Loading an older or hand-edited document fills missing fields with
//! defaults instead of failing.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use tracing::{error, warn};

use crate::types::{
    AgentNote, CommunityRecord, FollowRecord, JournalEntry, Memory, TopicStats,
};

pub const MAX_INTERACTED_POSTS: usize = 500;
pub const MAX_INTERACTED_COMMENTS: usize = 500;
pub const MAX_FOLLOWED_AGENTS: usize = 100;
pub const MAX_COMMUNITY_RECORDS: usize = 50;
pub const MAX_KNOWN_AGENTS: usize = 200;
pub const MAX_JOURNAL_ENTRIES: usize = 60;

/// Handle to the persisted memory document.
pub struct MemoryStore {
    path: PathBuf,
    pub memory: Memory,
}

impl MemoryStore {
    /// Load memory from `path`. A missing file yields empty defaults; a
    /// file that fails to parse is logged and replaced with defaults
    /// rather than crashing the cycle.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let memory = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<Memory>(&contents) {
                Ok(memory) => memory,
                Err(e) => {
                    warn!(path = %path.display(), "memory file unparseable, starting fresh: {e}");
                    Memory::default()
                }
            },
            Err(_) => Memory::default(),
        };

        Self { path, memory }
    }

    /// Persist memory to disk, enforcing every collection bound first.
    /// An I/O failure is logged and swallowed: the in-memory copy survives
    /// for the rest of the run, but no retry is attempted.
    pub fn persist(&mut self) {
        self.trim_bounds();
        if let Err(e) = self.write_file() {
            error!(path = %self.path.display(), "failed to persist memory: {e:#}");
        }
    }

    fn write_file(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create memory directory: {}", parent.display())
                })?;
            }
        }

        let json = serde_json::to_string_pretty(&self.memory)
            .context("failed to serialize memory")?;

        // Write-then-rename so a crash mid-write can't corrupt the document.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &json)
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to move memory into place at {}", self.path.display()))?;

        Ok(())
    }

    /// Enforce the FIFO bound on every collection, evicting oldest first.
    fn trim_bounds(&mut self) {
        trim_front(&mut self.memory.interacted_post_ids, MAX_INTERACTED_POSTS);
        trim_front(
            &mut self.memory.interacted_comment_ids,
            MAX_INTERACTED_COMMENTS,
        );
        trim_front(&mut self.memory.followed_agents, MAX_FOLLOWED_AGENTS);
        trim_front(
            &mut self.memory.subscribed_communities,
            MAX_COMMUNITY_RECORDS,
        );
        trim_front(&mut self.memory.created_communities, MAX_COMMUNITY_RECORDS);
        trim_front(&mut self.memory.journal, MAX_JOURNAL_ENTRIES);

        // The agent map has no insertion order; evict least-recently-seen.
        while self.memory.known_agents.len() > MAX_KNOWN_AGENTS {
            let oldest = self
                .memory
                .known_agents
                .iter()
                .min_by(|a, b| a.1.last_seen.cmp(&b.1.last_seen))
                .map(|(name, _)| name.clone());
            match oldest {
                Some(name) => {
                    self.memory.known_agents.remove(&name);
                }
                None => break,
            }
        }
    }

    // ─── Membership ──────────────────────────────────────────────

    pub fn has_interacted(&self, post_id: &str) -> bool {
        self.memory.interacted_post_ids.iter().any(|id| id == post_id)
    }

    /// No-op when already marked.
    pub fn mark_interacted(&mut self, post_id: &str) {
        if !self.has_interacted(post_id) {
            self.memory.interacted_post_ids.push(post_id.to_string());
        }
    }

    pub fn has_replied_to(&self, comment_id: &str) -> bool {
        self.memory
            .interacted_comment_ids
            .iter()
            .any(|id| id == comment_id)
    }

    pub fn mark_replied_to(&mut self, comment_id: &str) {
        if !self.has_replied_to(comment_id) {
            self.memory
                .interacted_comment_ids
                .push(comment_id.to_string());
        }
    }

    pub fn has_followed(&self, agent_name: &str) -> bool {
        self.memory
            .followed_agents
            .iter()
            .any(|f| f.name.eq_ignore_ascii_case(agent_name))
    }

    pub fn mark_followed(&mut self, agent_name: &str, now: DateTime<Utc>) {
        if !self.has_followed(agent_name) {
            self.memory.followed_agents.push(FollowRecord {
                name: agent_name.to_string(),
                followed_at: now.to_rfc3339(),
            });
        }
    }

    // ─── Cadence Gates ───────────────────────────────────────────

    /// True only when no follow in memory falls within the trailing 7 days.
    pub fn can_follow_this_week(&self, now: DateTime<Utc>) -> bool {
        !self
            .memory
            .followed_agents
            .iter()
            .any(|f| within_trailing_days(&f.followed_at, now, 7))
    }

    /// True while community creations in the trailing 7 days are under `cap`.
    pub fn can_create_community_this_week(&self, now: DateTime<Utc>, cap: u32) -> bool {
        let recent = self
            .memory
            .created_communities
            .iter()
            .filter(|c| within_trailing_days(&c.timestamp, now, 7))
            .count();
        (recent as u32) < cap
    }

    /// True once per calendar day.
    pub fn should_check_communities(&self, now: DateTime<Utc>) -> bool {
        let today = now.format("%Y-%m-%d").to_string();
        self.memory.last_community_check_day.as_deref() != Some(today.as_str())
    }

    pub fn mark_communities_checked(&mut self, now: DateTime<Utc>) {
        self.memory.last_community_check_day = Some(now.format("%Y-%m-%d").to_string());
    }

    // ─── Mutators ────────────────────────────────────────────────

    pub fn record_subscription(&mut self, community: &str, now: DateTime<Utc>) {
        if !self
            .memory
            .subscribed_communities
            .iter()
            .any(|c| c.name == community)
        {
            self.memory.subscribed_communities.push(CommunityRecord {
                name: community.to_string(),
                timestamp: now.to_rfc3339(),
            });
        }
    }

    pub fn record_community_created(&mut self, community: &str, now: DateTime<Utc>) {
        self.memory.created_communities.push(CommunityRecord {
            name: community.to_string(),
            timestamp: now.to_rfc3339(),
        });
    }

    /// Note an interaction with another agent, bumping its counter.
    pub fn note_agent(&mut self, handle: &str, sentiment: &str, note: &str, now: DateTime<Utc>) {
        let entry = self
            .memory
            .known_agents
            .entry(handle.to_string())
            .or_insert_with(AgentNote::default);
        entry.last_seen = now.to_rfc3339();
        entry.interaction_count += 1;
        if !sentiment.is_empty() {
            entry.sentiment = sentiment.to_string();
        }
        if !note.is_empty() {
            entry.note = note.to_string();
        }
    }

    /// Replace topic performance wholesale; it is rebuilt each time from a
    /// re-query of the agent's own recent posts.
    pub fn refresh_topic_performance(&mut self, stats: HashMap<String, TopicStats>) {
        if !stats.is_empty() {
            self.memory.topic_performance = stats;
        }
    }

    pub fn push_journal(&mut self, entry: JournalEntry) {
        self.memory.journal.push(entry);
    }

    pub fn record_heartbeat(&mut self, now: DateTime<Utc>) {
        self.memory.last_heartbeat_time = Some(now.to_rfc3339());
        self.memory.total_heartbeats += 1;
    }

    pub fn record_post_time(&mut self, now: DateTime<Utc>) {
        self.memory.last_post_time = Some(now.to_rfc3339());
    }
}

/// Drop oldest entries until `v` fits within `max`.
fn trim_front<T>(v: &mut Vec<T>, max: usize) {
    let excess = v.len().saturating_sub(max);
    if excess > 0 {
        v.drain(..excess);
    }
}

/// Whether an RFC3339 timestamp falls within the trailing `days` window
/// ending at `now`. Unparseable timestamps count as outside the window.
fn within_trailing_days(timestamp: &str, now: DateTime<Utc>, days: i64) -> bool {
    match DateTime::parse_from_rfc3339(timestamp) {
        Ok(t) => {
            let age = now.signed_duration_since(t.with_timezone(&Utc));
            age >= Duration::zero() && age < Duration::days(days)
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("moltbot-memory-{}.json", uuid::Uuid::new_v4()))
    }

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_mark_then_has_interacted_survives_reload() {
        let path = temp_path();
        let mut store = MemoryStore::load(&path);
        store.mark_interacted("post_abc");
        assert!(store.has_interacted("post_abc"));
        store.persist();

        let reloaded = MemoryStore::load(&path);
        assert!(reloaded.has_interacted("post_abc"));
        assert!(!reloaded.has_interacted("post_xyz"));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_mark_interacted_is_idempotent() {
        let mut store = MemoryStore::load(temp_path());
        store.mark_interacted("p1");
        store.mark_interacted("p1");
        assert_eq!(store.memory.interacted_post_ids.len(), 1);
    }

    #[test]
    fn test_bounds_hold_after_any_persist() {
        let path = temp_path();
        let mut store = MemoryStore::load(&path);
        for i in 0..(MAX_INTERACTED_POSTS + 250) {
            store.mark_interacted(&format!("post_{i}"));
        }
        for i in 0..(MAX_JOURNAL_ENTRIES + 10) {
            store.push_journal(JournalEntry {
                cycle_id: format!("c{i}"),
                ..Default::default()
            });
        }
        store.persist();

        assert_eq!(store.memory.interacted_post_ids.len(), MAX_INTERACTED_POSTS);
        assert_eq!(store.memory.journal.len(), MAX_JOURNAL_ENTRIES);
        // FIFO: the oldest ids are the ones evicted
        assert!(!store.has_interacted("post_0"));
        assert!(store.has_interacted(&format!("post_{}", MAX_INTERACTED_POSTS + 249)));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_known_agents_evicts_least_recently_seen() {
        let mut store = MemoryStore::load(temp_path());
        for i in 0..(MAX_KNOWN_AGENTS + 5) {
            let ts = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
                + Duration::minutes(i as i64);
            store.note_agent(&format!("agent_{i}"), "", "", ts);
        }
        store.trim_bounds();
        assert_eq!(store.memory.known_agents.len(), MAX_KNOWN_AGENTS);
        assert!(!store.memory.known_agents.contains_key("agent_0"));
        assert!(store
            .memory
            .known_agents
            .contains_key(&format!("agent_{}", MAX_KNOWN_AGENTS + 4)));
    }

    #[test]
    fn test_follow_week_gate_boundary() {
        let mut store = MemoryStore::load(temp_path());
        let followed = at("2026-08-01T12:00:00Z");
        store.mark_followed("agent_x", followed);

        assert!(!store.can_follow_this_week(at("2026-08-01T12:00:01Z")));
        assert!(!store.can_follow_this_week(at("2026-08-04T12:00:00Z")));
        // one second before the 7-day mark: still blocked
        assert!(!store.can_follow_this_week(at("2026-08-08T11:59:59Z")));
        // exactly on day 8: allowed again
        assert!(store.can_follow_this_week(at("2026-08-08T12:00:00Z")));
    }

    #[test]
    fn test_community_creation_weekly_cap() {
        let mut store = MemoryStore::load(temp_path());
        let now = at("2026-08-10T00:00:00Z");
        assert!(store.can_create_community_this_week(now, 1));
        store.record_community_created("rustagents", at("2026-08-09T00:00:00Z"));
        assert!(!store.can_create_community_this_week(now, 1));
        // creation older than a week does not count
        store.memory.created_communities.clear();
        store.record_community_created("oldmolt", at("2026-07-01T00:00:00Z"));
        assert!(store.can_create_community_this_week(now, 1));
    }

    #[test]
    fn test_community_check_once_per_day() {
        let mut store = MemoryStore::load(temp_path());
        let morning = at("2026-08-10T08:00:00Z");
        let evening = at("2026-08-10T20:00:00Z");
        let tomorrow = at("2026-08-11T08:00:00Z");

        assert!(store.should_check_communities(morning));
        store.mark_communities_checked(morning);
        assert!(!store.should_check_communities(evening));
        assert!(store.should_check_communities(tomorrow));
    }

    #[test]
    fn test_older_schema_loads_with_defaults() {
        let path = temp_path();
        fs::write(&path, r#"{"interactedPostIds":["legacy_post"]}"#).unwrap();
        let store = MemoryStore::load(&path);
        assert!(store.has_interacted("legacy_post"));
        assert!(store.memory.journal.is_empty());
        assert_eq!(store.memory.total_heartbeats, 0);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_corrupt_file_starts_fresh() {
        let path = temp_path();
        fs::write(&path, "{not json at all").unwrap();
        let store = MemoryStore::load(&path);
        assert!(store.memory.interacted_post_ids.is_empty());
        let _ = fs::remove_file(&path);
    }
}
