//! Platform Payload Parsing
//!
//! The platform returns loosely-typed JSON with inconsistent key casing.
//! Everything is normalized into explicit records here, at the boundary,
//! with defaulting on ingress; nothing downstream touches raw `Value`s.

use serde_json::Value;

use crate::types::{AccountStatus, CommunityInfo, FeedComment, FeedItem, OwnProfile};

/// Pull a string out of the first key that holds one.
fn str_of(v: &Value, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|k| v[k].as_str())
        .unwrap_or("")
        .to_string()
}

fn int_of(v: &Value, keys: &[&str]) -> i64 {
    keys.iter().find_map(|k| v[k].as_i64()).unwrap_or(0)
}

fn uint_of(v: &Value, keys: &[&str]) -> u64 {
    keys.iter().find_map(|k| v[k].as_u64()).unwrap_or(0)
}

/// Parse one post. Returns `None` when the payload carries no identifier,
/// since an id-less post can never be acted upon.
pub fn parse_feed_item(v: &Value) -> Option<FeedItem> {
    let id = str_of(v, &["id", "postId", "post_id"]);
    if id.is_empty() {
        return None;
    }

    Some(FeedItem {
        id,
        title: str_of(v, &["title"]),
        body: str_of(v, &["body", "content", "text"]),
        author: str_of(v, &["author", "authorName", "author_name"]),
        submolt: str_of(v, &["submolt", "community"]),
        upvotes: int_of(v, &["upvotes", "score"]),
        downvotes: int_of(v, &["downvotes"]),
        comment_count: uint_of(v, &["commentCount", "comment_count", "numComments"]),
        created_at: str_of(v, &["createdAt", "created_at"]),
        comments: Vec::new(),
    })
}

/// Parse a feed response: either a bare array or `{"posts": [...]}`.
pub fn parse_feed(v: &Value) -> Vec<FeedItem> {
    let list = v["posts"].as_array().or_else(|| v.as_array());
    list.map(|items| items.iter().filter_map(parse_feed_item).collect())
        .unwrap_or_default()
}

/// Parse one comment plus its nested replies, flattened depth-first.
/// Every comment id must be individually addressable as a reply target.
fn parse_comment_tree(v: &Value, out: &mut Vec<FeedComment>) {
    let id = str_of(v, &["id", "commentId", "comment_id"]);
    if !id.is_empty() {
        out.push(FeedComment {
            id,
            author: str_of(v, &["author", "authorName", "author_name"]),
            body: str_of(v, &["body", "content", "text"]),
            created_at: str_of(v, &["createdAt", "created_at"]),
        });
    }
    if let Some(replies) = v["replies"].as_array() {
        for reply in replies {
            parse_comment_tree(reply, out);
        }
    }
}

/// Parse a comments response: bare array or `{"comments": [...]}`.
pub fn parse_comments(v: &Value) -> Vec<FeedComment> {
    let list = v["comments"].as_array().or_else(|| v.as_array());
    let mut out = Vec::new();
    if let Some(items) = list {
        for item in items {
            parse_comment_tree(item, &mut out);
        }
    }
    out
}

pub fn parse_account_status(v: &Value) -> AccountStatus {
    AccountStatus {
        name: str_of(v, &["name", "agentName", "agent_name"]),
        karma: int_of(v, &["karma"]),
        follower_count: uint_of(v, &["followerCount", "follower_count", "followers"]),
        following_count: uint_of(v, &["followingCount", "following_count", "following"]),
    }
}

pub fn parse_own_profile(v: &Value) -> OwnProfile {
    OwnProfile {
        name: str_of(v, &["name", "agentName", "agent_name"]),
        description: str_of(v, &["description", "bio"]),
        created_at: str_of(v, &["createdAt", "created_at"]),
    }
}

pub fn parse_communities(v: &Value) -> Vec<CommunityInfo> {
    let list = v["submolts"]
        .as_array()
        .or_else(|| v["communities"].as_array())
        .or_else(|| v.as_array());
    list.map(|items| {
        items
            .iter()
            .filter_map(|c| {
                let name = str_of(c, &["name"]);
                if name.is_empty() {
                    return None;
                }
                Some(CommunityInfo {
                    name,
                    title: str_of(c, &["title", "displayName", "display_name"]),
                    description: str_of(c, &["description"]),
                    subscriber_count: uint_of(
                        c,
                        &["subscriberCount", "subscriber_count", "subscribers"],
                    ),
                })
            })
            .collect()
    })
    .unwrap_or_default()
}

/// Parse search results; posts and agents come back under different keys
/// depending on the query type.
pub fn parse_search_posts(v: &Value) -> Vec<FeedItem> {
    let list = v["results"]
        .as_array()
        .or_else(|| v["posts"].as_array())
        .or_else(|| v.as_array());
    list.map(|items| items.iter().filter_map(parse_feed_item).collect())
        .unwrap_or_default()
}

pub fn parse_search_agents(v: &Value) -> Vec<String> {
    let list = v["results"]
        .as_array()
        .or_else(|| v["agents"].as_array())
        .or_else(|| v.as_array());
    list.map(|items| {
        items
            .iter()
            .filter_map(|a| {
                let name = str_of(a, &["name", "agentName", "agent_name"]);
                if name.is_empty() {
                    None
                } else {
                    Some(name)
                }
            })
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_feed_item_without_id_is_dropped() {
        let v = json!({"title": "no id here", "body": "x"});
        assert!(parse_feed_item(&v).is_none());
    }

    #[test]
    fn test_feed_item_defaults_missing_fields() {
        let v = json!({"id": "p1", "title": "hello"});
        let item = parse_feed_item(&v).unwrap();
        assert_eq!(item.id, "p1");
        assert_eq!(item.body, "");
        assert_eq!(item.upvotes, 0);
    }

    #[test]
    fn test_feed_accepts_wrapped_and_bare_arrays() {
        let wrapped = json!({"posts": [{"id": "a"}, {"id": "b"}]});
        let bare = json!([{"id": "a"}]);
        assert_eq!(parse_feed(&wrapped).len(), 2);
        assert_eq!(parse_feed(&bare).len(), 1);
    }

    #[test]
    fn test_nested_replies_are_flattened() {
        let v = json!({"comments": [
            {"id": "c1", "body": "top", "replies": [
                {"id": "c2", "body": "nested", "replies": [{"id": "c3"}]}
            ]}
        ]});
        let comments = parse_comments(&v);
        let ids: Vec<&str> = comments.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2", "c3"]);
    }

    #[test]
    fn test_alternate_key_casings() {
        let v = json!({"post_id": "p9", "author_name": "molty", "comment_count": 4});
        let item = parse_feed_item(&v).unwrap();
        assert_eq!(item.id, "p9");
        assert_eq!(item.author, "molty");
        assert_eq!(item.comment_count, 4);
    }
}
