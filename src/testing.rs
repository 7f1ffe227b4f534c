//! In-memory collaborators for unit tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::types::{
    AccountStatus, ActivitySnapshot, ApiResponse, CommunityInfo, CommunitySpec, DecisionEngine,
    FeedComment, FeedItem, MoltClient, OwnProfile, RegistrationResult, SearchKind, SearchResults,
};

/// A `MoltClient` that records every call and answers from canned data.
pub struct RecordingClient {
    feed: Vec<FeedItem>,
    calls: Mutex<Vec<String>>,
    suspend_writes: Option<String>,
    suspend_status: Option<String>,
    fail_writes: bool,
    pub communities: Vec<CommunityInfo>,
    pub search_posts: Vec<FeedItem>,
}

impl RecordingClient {
    pub fn new(feed: Vec<FeedItem>) -> Self {
        Self {
            feed,
            calls: Mutex::new(Vec::new()),
            suspend_writes: None,
            suspend_status: None,
            fail_writes: false,
            communities: Vec::new(),
            search_posts: Vec::new(),
        }
    }

    /// Every write call reports a suspended account.
    pub fn suspend_writes(mut self, reason: &str) -> Self {
        self.suspend_writes = Some(reason.to_string());
        self
    }

    /// `get_account_status` reports a suspended account.
    pub fn suspend_status(mut self, reason: &str) -> Self {
        self.suspend_status = Some(reason.to_string());
        self
    }

    /// Every write call fails without a suspension signal.
    pub fn fail_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn write<T>(&self, call: String, payload: T) -> ApiResponse<T> {
        self.record(call);
        if let Some(ref reason) = self.suspend_writes {
            return ApiResponse::suspended(reason.clone());
        }
        if self.fail_writes {
            return ApiResponse::missing();
        }
        ApiResponse::ok(payload)
    }
}

#[async_trait]
impl MoltClient for RecordingClient {
    async fn register(&self, name: &str, _description: &str) -> ApiResponse<RegistrationResult> {
        self.record(format!("register:{name}"));
        ApiResponse::ok(RegistrationResult {
            api_key: "test-key".to_string(),
            agent_name: name.to_string(),
        })
    }

    async fn get_account_status(&self) -> ApiResponse<AccountStatus> {
        self.record("status".to_string());
        if let Some(ref reason) = self.suspend_status {
            return ApiResponse::suspended(reason.clone());
        }
        ApiResponse::ok(AccountStatus {
            name: "testbot".to_string(),
            karma: 10,
            follower_count: 1,
            following_count: 1,
        })
    }

    async fn get_own_profile(&self) -> ApiResponse<OwnProfile> {
        self.record("profile".to_string());
        ApiResponse::ok(OwnProfile {
            name: "testbot".to_string(),
            description: String::new(),
            created_at: String::new(),
        })
    }

    async fn get_feed(&self, _sort: &str, _limit: u32) -> ApiResponse<Vec<FeedItem>> {
        self.record("feed".to_string());
        ApiResponse::ok(self.feed.clone())
    }

    async fn get_comments(&self, post_id: &str, _sort: &str) -> ApiResponse<Vec<FeedComment>> {
        self.record(format!("comments:{post_id}"));
        let comments = self
            .feed
            .iter()
            .find(|p| p.id == post_id)
            .map(|p| p.comments.clone())
            .unwrap_or_default();
        ApiResponse::ok(comments)
    }

    async fn create_post(&self, submolt: &str, title: &str, _body: &str) -> ApiResponse<String> {
        self.write(format!("post:{submolt}:{title}"), "new_post_id".to_string())
    }

    async fn create_comment(
        &self,
        post_id: &str,
        _text: &str,
        parent_id: Option<&str>,
    ) -> ApiResponse<String> {
        let call = match parent_id {
            Some(parent) => format!("reply:{post_id}:{parent}"),
            None => format!("comment:{post_id}"),
        };
        self.write(call, "new_comment_id".to_string())
    }

    async fn upvote(&self, post_id: &str) -> ApiResponse<()> {
        self.write(format!("upvote:{post_id}"), ())
    }

    async fn follow(&self, agent_name: &str) -> ApiResponse<()> {
        self.write(format!("follow:{agent_name}"), ())
    }

    async fn list_communities(&self) -> ApiResponse<Vec<CommunityInfo>> {
        self.record("communities".to_string());
        ApiResponse::ok(self.communities.clone())
    }

    async fn subscribe(&self, community: &str) -> ApiResponse<()> {
        self.write(format!("subscribe:{community}"), ())
    }

    async fn create_community(&self, spec: &CommunitySpec) -> ApiResponse<()> {
        self.write(format!("create_community:{}", spec.name), ())
    }

    async fn search(
        &self,
        query: &str,
        _kind: SearchKind,
        _limit: u32,
    ) -> ApiResponse<SearchResults> {
        self.record(format!("search:{query}"));
        ApiResponse::ok(SearchResults {
            posts: self.search_posts.clone(),
            agents: Vec::new(),
        })
    }
}

/// A `DecisionEngine` that returns a fixed completion and remembers the
/// digest it was shown.
pub struct ScriptedEngine {
    completion: String,
    seen_digest: Mutex<String>,
}

impl ScriptedEngine {
    pub fn new(completion: &str) -> Self {
        Self {
            completion: completion.to_string(),
            seen_digest: Mutex::new(String::new()),
        }
    }

    /// The digest from the most recent `decide` call.
    pub fn seen_digest(&self) -> String {
        self.seen_digest.lock().unwrap().clone()
    }
}

#[async_trait]
impl DecisionEngine for ScriptedEngine {
    async fn decide(
        &self,
        digest: &str,
        _briefing: &str,
        _activity: &ActivitySnapshot,
    ) -> anyhow::Result<String> {
        *self.seen_digest.lock().unwrap() = digest.to_string();
        Ok(self.completion.clone())
    }
}
