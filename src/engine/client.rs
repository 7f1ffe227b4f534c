//! Engine HTTP Client
//!
//! Wraps an OpenAI-compatible /v1/chat/completions endpoint. The agent
//! sends one request per cycle: feed digest, memory briefing, and its
//! recent-activity counters; the completion text comes back raw and is
//! parsed by `engine::parse`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::types::{ActivitySnapshot, DecisionEngine};

/// The schema the engine must answer with. Kept in the system prompt so a
/// misbehaving engine fails the shape check instead of slipping through.
const PLAN_SCHEMA_HINT: &str = r#"Respond with JSON only, matching:
{
  "actions": [
    {"kind": "upvote|comment|reply|skip", "targetPostId": "...",
     "targetCommentId": "... (reply only)", "text": "... (comment/reply only)",
     "rationale": "..."}
  ],
  "newPost": {"submolt": "...", "title": "...", "body": "..."} or null,
  "summary": "one sentence on what you did this cycle and why"
}
Only reference post and comment identifiers that appear in the feed digest."#;

pub struct EngineHttpClient {
    api_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    persona: String,
    http: Client,
}

impl EngineHttpClient {
    pub fn new(
        api_url: String,
        api_key: String,
        model: String,
        max_tokens: u32,
        persona: String,
    ) -> Self {
        Self {
            api_url,
            api_key,
            model,
            max_tokens,
            persona,
            http: Client::new(),
        }
    }

    fn system_prompt(&self) -> String {
        format!(
            "You are a participant on an agent-only forum. Persona: {}\n\n\
             You receive a feed digest and a memory briefing each cycle and \
             decide how to participate: upvote, comment, reply, or skip, plus \
             at most one new post. Be selective; most posts deserve nothing.\n\n{}",
            self.persona, PLAN_SCHEMA_HINT
        )
    }
}

#[async_trait]
impl DecisionEngine for EngineHttpClient {
    async fn decide(
        &self,
        digest: &str,
        briefing: &str,
        activity: &ActivitySnapshot,
    ) -> Result<String> {
        let user_prompt = format!(
            "## Memory briefing\n{}\n\n## Activity\ncomments today: {}, posts today: {}, lifetime cycles: {}\n\n## Feed\n{}",
            briefing,
            activity.comments_today,
            activity.posts_today,
            activity.total_heartbeats,
            digest
        );

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": self.system_prompt()},
                {"role": "user", "content": user_prompt},
            ],
            "max_tokens": self.max_tokens,
            "stream": false,
        });

        let url = format!("{}/v1/chat/completions", self.api_url);
        let resp = self
            .http
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .context("decision engine request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("decision engine error: {}: {}", status.as_u16(), text);
        }

        let data: Value = resp
            .json()
            .await
            .context("failed to parse decision engine response")?;

        let content = data["choices"]
            .get(0)
            .and_then(|c| c["message"]["content"].as_str())
            .ok_or_else(|| anyhow::anyhow!("no completion choice returned from engine"))?;

        Ok(content.to_string())
    }
}
