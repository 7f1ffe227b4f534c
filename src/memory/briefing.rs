//! Memory Briefing
//!
//! Renders the decision-relevant slice of memory into a compact text
//! block for the decision engine's prompt. This is how the agent learns
//! across cycles without any model fine-tuning.

use crate::types::Memory;

/// Engagement score used to rank topics: comments are worth twice an
/// upvote since they indicate conversation, not just a click.
fn engagement_score(upvotes: i64, comments: u64) -> i64 {
    upvotes + 2 * comments as i64
}

/// Build the briefing text from memory.
pub fn build_briefing(memory: &Memory) -> String {
    let mut sections: Vec<String> = Vec::new();

    sections.push(format!(
        "Heartbeats so far: {}. Posts interacted with: {}. Agents followed: {}.",
        memory.total_heartbeats,
        memory.interacted_post_ids.len(),
        memory.followed_agents.len(),
    ));

    // Best-performing topics, highest engagement first.
    if !memory.topic_performance.is_empty() {
        let mut topics: Vec<(&String, i64)> = memory
            .topic_performance
            .iter()
            .map(|(topic, stats)| {
                (
                    topic,
                    engagement_score(stats.total_upvotes, stats.total_comments),
                )
            })
            .collect();
        topics.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));

        let lines: Vec<String> = topics
            .iter()
            .take(5)
            .map(|(topic, score)| format!("- {} (engagement {})", topic, score))
            .collect();
        sections.push(format!(
            "Your best-performing topics:\n{}",
            lines.join("\n")
        ));
    }

    // Agents we keep running into.
    let mut familiar: Vec<(&String, u32)> = memory
        .known_agents
        .iter()
        .filter(|(_, note)| note.interaction_count >= 2)
        .map(|(name, note)| (name, note.interaction_count))
        .collect();
    if !familiar.is_empty() {
        familiar.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        let lines: Vec<String> = familiar
            .iter()
            .take(8)
            .map(|(name, count)| {
                let note = &memory.known_agents[*name];
                if note.sentiment.is_empty() {
                    format!("- {} ({} interactions)", name, count)
                } else {
                    format!("- {} ({} interactions, {})", name, count, note.sentiment)
                }
            })
            .collect();
        sections.push(format!("Agents you know:\n{}", lines.join("\n")));
    }

    if !memory.followed_agents.is_empty() {
        let recent: Vec<&str> = memory
            .followed_agents
            .iter()
            .rev()
            .take(5)
            .map(|f| f.name.as_str())
            .collect();
        sections.push(format!("Recently followed: {}", recent.join(", ")));
    }

    // Recent cycle outcomes from the journal.
    if !memory.journal.is_empty() {
        let lines: Vec<String> = memory
            .journal
            .iter()
            .rev()
            .take(3)
            .map(|j| {
                format!(
                    "- {}: {} upvotes, {} comments, {} posts. {}",
                    j.timestamp, j.upvotes_given, j.comments_made, j.posts_made, j.summary
                )
            })
            .collect();
        sections.push(format!("Recent cycles:\n{}", lines.join("\n")));
    }

    sections.join("\n\n")
}
