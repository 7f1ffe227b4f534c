//! Decision Plan Parsing
//!
//! Turns raw completion text into a `DecisionPlan`. Engines wrap JSON in
//! prose or code fences and sometimes truncate mid-structure; the salvage
//! path trims the trailing malformed fragment and closes the structure
//! before giving up.

use tracing::{debug, warn};

use crate::types::DecisionPlan;

/// Parse the engine's raw output into a plan. Returns `None` only when
/// nothing parseable can be recovered; the caller substitutes an empty
/// no-op plan and records a decision error for the cycle.
pub fn parse_plan(raw: &str) -> Option<DecisionPlan> {
    let candidate = extract_json(raw)?;

    match serde_json::from_str::<DecisionPlan>(candidate) {
        Ok(plan) => Some(plan),
        Err(e) => {
            debug!(error = %e, "plan did not parse cleanly, attempting salvage");
            let salvaged = salvage(candidate);
            if salvaged.is_none() {
                warn!("decision engine output unsalvageable");
            }
            salvaged
        }
    }
}

/// Strip prose and code fences, returning the slice from the first `{`
/// to the end.
fn extract_json(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let tail = &raw[start..];
    // Cut a trailing code fence if one survived.
    match tail.rfind("```") {
        Some(fence) => Some(tail[..fence].trim_end()),
        None => Some(tail.trim_end()),
    }
}

/// Trim the trailing malformed fragment and close the structure.
///
/// Walks the text once, recording every position where a value just
/// closed outside a string literal along with the brackets still open
/// there, then retries parsing from the latest such position backwards
/// with the open brackets closed.
fn salvage(text: &str) -> Option<DecisionPlan> {
    // (byte offset just past a '}' or ']', closers needed to finish)
    let mut cut_points: Vec<(usize, String)> = Vec::new();
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.last() == Some(&c) {
                    stack.pop();
                    let closers: String = stack.iter().rev().collect();
                    cut_points.push((i + c.len_utf8(), closers));
                } else {
                    // Mismatched closer: nothing beyond this point is sound.
                    break;
                }
            }
            _ => {}
        }
    }

    for (end, closers) in cut_points.iter().rev() {
        let attempt = format!("{}{}", &text[..*end], closers);
        if let Ok(plan) = serde_json::from_str::<DecisionPlan>(&attempt) {
            debug!(kept_bytes = end, "salvaged truncated decision plan");
            return Some(plan);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ActionKind;

    #[test]
    fn test_well_formed_plan_parses() {
        let raw = r#"{"actions":[{"kind":"upvote","targetPostId":"p1"}],"summary":"quiet cycle"}"#;
        let plan = parse_plan(raw).unwrap();
        assert_eq!(plan.actions.len(), 1);
        assert_eq!(plan.actions[0].kind, ActionKind::Upvote);
        assert_eq!(plan.summary, "quiet cycle");
    }

    #[test]
    fn test_fenced_json_with_prose_parses() {
        let raw = "Here is my plan:\n```json\n{\"actions\":[],\"summary\":\"nothing worth doing\"}\n```";
        let plan = parse_plan(raw).unwrap();
        assert!(plan.actions.is_empty());
        assert_eq!(plan.summary, "nothing worth doing");
    }

    #[test]
    fn test_truncated_plan_salvages_complete_prefix() {
        let raw = r#"{"actions":[{"kind":"upvote","targetPostId":"p1"},{"kind":"comment","targetPostId":"p2","text":"nice po"#;
        let plan = parse_plan(raw).unwrap();
        assert_eq!(plan.actions.len(), 1);
        assert_eq!(plan.actions[0].target_post_id, "p1");
    }

    #[test]
    fn test_truncated_inside_string_yields_none() {
        let raw = r#"{"summary":"started writing and then the response got cut o"#;
        // No complete value boundary with a parseable prefix: nothing to keep.
        assert!(parse_plan(raw).is_none());
    }

    #[test]
    fn test_garbage_yields_none() {
        assert!(parse_plan("I decline to answer in JSON today.").is_none());
        assert!(parse_plan("").is_none());
    }

    #[test]
    fn test_unknown_kind_fails_shape_check() {
        let raw = r#"{"actions":[{"kind":"downvote","targetPostId":"p1"}]}"#;
        assert!(parse_plan(raw).is_none());
    }
}
