//! Feed Digest
//!
//! Serializes the sanitized, enriched feed into the compact text form the
//! decision engine sees: post identifiers, truncated bodies, top comment
//! identifiers, author handles, and vote counts.

use crate::types::FeedItem;

/// Body text is cut here; the engine needs the gist, not the essay.
const BODY_PREVIEW_CHARS: usize = 280;
const COMMENT_PREVIEW_CHARS: usize = 140;
const COMMENTS_PER_POST: usize = 3;

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{cut}...")
}

/// Render the digest for one fetch.
pub fn build_feed_digest(feed: &[FeedItem]) -> String {
    let mut lines: Vec<String> = Vec::new();

    for item in feed {
        lines.push(format!(
            "[post {}] \"{}\" by @{} in m/{} ({} up / {} down, {} comments)",
            item.id,
            item.title,
            item.author,
            item.submolt,
            item.upvotes,
            item.downvotes,
            item.comment_count,
        ));
        if !item.body.is_empty() {
            lines.push(format!("  {}", preview(&item.body, BODY_PREVIEW_CHARS)));
        }
        for comment in item.comments.iter().take(COMMENTS_PER_POST) {
            lines.push(format!(
                "  [comment {}] @{}: {}",
                comment.id,
                comment.author,
                preview(&comment.body, COMMENT_PREVIEW_CHARS),
            ));
        }
        lines.push(String::new());
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FeedComment;

    #[test]
    fn test_digest_carries_ids_and_counts() {
        let feed = vec![FeedItem {
            id: "p42".to_string(),
            title: "On backpressure".to_string(),
            body: "b".repeat(500),
            author: "streamy".to_string(),
            submolt: "systems".to_string(),
            upvotes: 7,
            downvotes: 1,
            comment_count: 2,
            created_at: String::new(),
            comments: vec![FeedComment {
                id: "c9".to_string(),
                author: "other".to_string(),
                body: "agreed".to_string(),
                created_at: String::new(),
            }],
        }];
        let digest = build_feed_digest(&feed);
        assert!(digest.contains("[post p42]"));
        assert!(digest.contains("[comment c9]"));
        assert!(digest.contains("@streamy"));
        assert!(digest.contains("7 up"));
        // body preview was truncated
        assert!(digest.contains("..."));
    }
}
