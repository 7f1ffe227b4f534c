//! Platform HTTP Client
//!
//! Talks to the platform's REST API. Internal calls fail with a typed
//! `ApiError` so the log keeps the distinction between rate limiting,
//! suspension, and generic failure; the public trait methods degrade all
//! of them to the null sentinel and never return an error.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::types::{
    AccountStatus, ApiResponse, CommunityInfo, CommunitySpec, FeedComment, FeedItem,
    MoltClient, OwnProfile, RegistrationResult, SearchKind, SearchResults,
};

use super::payloads;

/// Phrases in a non-2xx body that indicate the account is suspended
/// rather than the request merely failing.
const SUSPENSION_LEXICON: &[&str] = &[
    "suspended",
    "banned",
    "account disabled",
    "account locked",
];

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("rate limited (429): {0}")]
    RateLimited(String),
    #[error("account suspended: {0}")]
    Suspended(String),
    #[error("platform returned {status}: {body}")]
    Http { status: u16, body: String },
    #[error("transport error: {0}")]
    Transport(String),
}

/// HTTP implementation of [`MoltClient`].
pub struct MoltHttpClient {
    pub api_url: String,
    api_key: String,
    http: Client,
}

impl MoltHttpClient {
    pub fn new(api_url: String, api_key: String) -> Self {
        Self {
            api_url,
            api_key,
            http: Client::new(),
        }
    }

    /// Send a request and return the body as JSON. Non-2xx responses
    /// become typed errors; bodies matching the suspension lexicon are
    /// classified as `Suspended` regardless of status code.
    async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.api_url, path);

        let mut builder = match method {
            "GET" => self.http.get(&url),
            "POST" => self.http.post(&url),
            "PUT" => self.http.put(&url),
            "DELETE" => self.http.delete(&url),
            _ => self.http.get(&url),
        };

        builder = builder
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key));

        if let Some(b) = body {
            builder = builder.json(&b);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let lowered = text.to_lowercase();
            if SUSPENSION_LEXICON.iter().any(|s| lowered.contains(s)) {
                return Err(ApiError::Suspended(text));
            }
            if status.as_u16() == 429 {
                return Err(ApiError::RateLimited(text));
            }
            return Err(ApiError::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        resp.json::<Value>()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))
    }

    /// Degrade a typed error to the sentinel, preserving the taxonomy
    /// only in the log.
    fn degrade<T>(op: &str, result: Result<T, ApiError>) -> ApiResponse<T> {
        match result {
            Ok(payload) => ApiResponse::ok(payload),
            Err(ApiError::Suspended(reason)) => {
                warn!(op, %reason, "platform reports account suspension");
                ApiResponse::suspended(reason)
            }
            Err(ApiError::RateLimited(body)) => {
                warn!(op, %body, "platform rate limit hit");
                ApiResponse::missing()
            }
            Err(e) => {
                warn!(op, error = %e, "platform call failed");
                ApiResponse::missing()
            }
        }
    }
}

#[async_trait]
impl MoltClient for MoltHttpClient {
    async fn register(&self, name: &str, description: &str) -> ApiResponse<RegistrationResult> {
        let body = serde_json::json!({ "name": name, "description": description });
        let result = self
            .request("POST", "/agents/register", Some(body))
            .await
            .map(|v| RegistrationResult {
                api_key: v["apiKey"]
                    .as_str()
                    .or_else(|| v["api_key"].as_str())
                    .unwrap_or("")
                    .to_string(),
                agent_name: v["name"].as_str().unwrap_or(name).to_string(),
            });
        Self::degrade("register", result)
    }

    async fn get_account_status(&self) -> ApiResponse<AccountStatus> {
        let result = self.request("GET", "/agents/me", None).await;

        // A 2xx payload can still carry a suspension flag.
        if let Ok(ref v) = result {
            if v["suspended"].as_bool().unwrap_or(false) {
                let reason = v["suspensionReason"]
                    .as_str()
                    .unwrap_or("suspended")
                    .to_string();
                warn!(%reason, "account status payload marks account suspended");
                return ApiResponse::suspended(reason);
            }
        }

        Self::degrade("get_account_status", result.map(|v| payloads::parse_account_status(&v)))
    }

    async fn get_own_profile(&self) -> ApiResponse<OwnProfile> {
        let result = self
            .request("GET", "/agents/me/profile", None)
            .await
            .map(|v| payloads::parse_own_profile(&v));
        Self::degrade("get_own_profile", result)
    }

    async fn get_feed(&self, sort: &str, limit: u32) -> ApiResponse<Vec<FeedItem>> {
        let path = format!("/feed?sort={}&limit={}", urlencoding::encode(sort), limit);
        let result = self
            .request("GET", &path, None)
            .await
            .map(|v| payloads::parse_feed(&v));
        Self::degrade("get_feed", result)
    }

    async fn get_comments(&self, post_id: &str, sort: &str) -> ApiResponse<Vec<FeedComment>> {
        let path = format!(
            "/posts/{}/comments?sort={}",
            urlencoding::encode(post_id),
            urlencoding::encode(sort)
        );
        let result = self
            .request("GET", &path, None)
            .await
            .map(|v| payloads::parse_comments(&v));
        Self::degrade("get_comments", result)
    }

    async fn create_post(&self, submolt: &str, title: &str, body: &str) -> ApiResponse<String> {
        let payload = serde_json::json!({
            "submolt": submolt,
            "title": title,
            "body": body,
        });
        let result = self
            .request("POST", "/posts", Some(payload))
            .await
            .map(|v| v["id"].as_str().unwrap_or("").to_string());
        Self::degrade("create_post", result)
    }

    async fn create_comment(
        &self,
        post_id: &str,
        text: &str,
        parent_id: Option<&str>,
    ) -> ApiResponse<String> {
        let mut payload = serde_json::json!({ "body": text });
        if let Some(parent) = parent_id {
            payload["parentId"] = serde_json::json!(parent);
        }
        let path = format!("/posts/{}/comments", urlencoding::encode(post_id));
        let result = self
            .request("POST", &path, Some(payload))
            .await
            .map(|v| v["id"].as_str().unwrap_or("").to_string());
        Self::degrade("create_comment", result)
    }

    async fn upvote(&self, post_id: &str) -> ApiResponse<()> {
        let path = format!("/posts/{}/upvote", urlencoding::encode(post_id));
        let result = self.request("POST", &path, None).await.map(|_| ());
        Self::degrade("upvote", result)
    }

    async fn follow(&self, agent_name: &str) -> ApiResponse<()> {
        let path = format!("/agents/{}/follow", urlencoding::encode(agent_name));
        let result = self.request("POST", &path, None).await.map(|_| ());
        Self::degrade("follow", result)
    }

    async fn list_communities(&self) -> ApiResponse<Vec<CommunityInfo>> {
        let result = self
            .request("GET", "/submolts", None)
            .await
            .map(|v| payloads::parse_communities(&v));
        Self::degrade("list_communities", result)
    }

    async fn subscribe(&self, community: &str) -> ApiResponse<()> {
        let path = format!("/submolts/{}/subscribe", urlencoding::encode(community));
        let result = self.request("POST", &path, None).await.map(|_| ());
        Self::degrade("subscribe", result)
    }

    async fn create_community(&self, spec: &CommunitySpec) -> ApiResponse<()> {
        let payload = serde_json::json!({
            "name": spec.name,
            "title": spec.title,
            "description": spec.description,
        });
        let result = self
            .request("POST", "/submolts", Some(payload))
            .await
            .map(|_| ());
        Self::degrade("create_community", result)
    }

    async fn search(
        &self,
        query: &str,
        kind: SearchKind,
        limit: u32,
    ) -> ApiResponse<SearchResults> {
        let type_param = match kind {
            SearchKind::Posts => "posts",
            SearchKind::Agents => "agents",
        };
        let path = format!(
            "/search?q={}&type={}&limit={}",
            urlencoding::encode(query),
            type_param,
            limit
        );
        debug!(query, type_param, "searching platform");
        let result = self.request("GET", &path, None).await.map(|v| match kind {
            SearchKind::Posts => SearchResults {
                posts: payloads::parse_search_posts(&v),
                agents: Vec::new(),
            },
            SearchKind::Agents => SearchResults {
                posts: Vec::new(),
                agents: payloads::parse_search_agents(&v),
            },
        });
        Self::degrade("search", result)
    }
}
