//! Parsing and repair of model-produced knowledge point payloads.
//!
//! The model is asked for `{"knowledge_points": [{title, content, description}]}`
//! but frequently wraps it in prose or code fences, or leaks raw control
//! characters into strings. Parsing runs in two stages: a strict parse of the
//! cleaned payload, then a regex pull of the `knowledge_points` array.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use kpoint_core::{KnowledgePoint, point_id};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Upper bound on records taken from a single model response.
pub const MAX_MODEL_POINTS: usize = 5;

static KNOWLEDGE_POINTS_ARRAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""knowledge_points"\s*:\s*(\[)"#).expect("valid regex literal")
});

#[derive(Debug, Deserialize)]
struct Envelope {
    knowledge_points: Vec<Value>,
}

/// A record that passed validation but has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub title: String,
    pub content: String,
    pub description: String,
}

/// Remove every control character (including newlines inside strings).
pub fn strip_control_chars(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_control()).collect()
}

/// Drop a surrounding Markdown code fence if present.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Extract the raw `knowledge_points` records from model output.
///
/// Returns `None` when neither the strict parse nor the regex repair yields
/// an array.
pub fn parse_records(content: &str) -> Option<Vec<Value>> {
    let cleaned = strip_control_chars(strip_code_fences(content));

    match serde_json::from_str::<Envelope>(&cleaned) {
        Ok(envelope) => return Some(envelope.knowledge_points),
        Err(err) => debug!(error = %err, "strict parse of model payload failed, trying repair"),
    }

    // Parse only the first JSON value after the key; trailing prose is ignored.
    let start = KNOWLEDGE_POINTS_ARRAY.captures(&cleaned)?.get(1)?.start();
    let mut stream =
        serde_json::Deserializer::from_str(&cleaned[start..]).into_iter::<Vec<Value>>();
    match stream.next()? {
        Ok(records) => Some(records),
        Err(err) => {
            debug!(error = %err, "repaired knowledge_points fragment did not parse");
            None
        }
    }
}

/// Keep records that carry string `title`, `content` and `description`,
/// up to [`MAX_MODEL_POINTS`].
pub fn validate_records(records: &[Value]) -> Vec<Candidate> {
    records
        .iter()
        .filter_map(|record| {
            let field = |name: &str| record.get(name)?.as_str().map(str::to_string);
            Some(Candidate {
                title: field("title")?,
                content: field("content")?,
                description: field("description")?,
            })
        })
        .take(MAX_MODEL_POINTS)
        .collect()
}

/// Assign batch ids and turn candidates into unselected, unsaved points.
pub fn finalize(candidates: Vec<Candidate>, generated_at: DateTime<Utc>) -> Vec<KnowledgePoint> {
    candidates
        .into_iter()
        .enumerate()
        .map(|(ordinal, candidate)| {
            KnowledgePoint::new(
                point_id(generated_at, ordinal),
                &candidate.title,
                candidate.content,
                candidate.description,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strict_payload() {
        let content = r#"{"knowledge_points":[{"title":"A","content":"B","description":"C"}]}"#;
        let records = parse_records(content).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["title"], "A");
    }

    #[test]
    fn test_prose_wrapped_payload_is_repaired() {
        let content = r#"Sure! Here you go: {"knowledge_points": [{"title":"Gravity","content":"Mass attracts mass","description":"Physics"}]} Hope that helps."#;
        let records = parse_records(content).unwrap();
        assert_eq!(validate_records(&records).len(), 1);
    }

    #[test]
    fn test_trailing_brackets_after_array() {
        let content = r#"Result: {"knowledge_points": [{"title":"Gravity","content":"Mass attracts mass","description":"Physics"}, {"title":"Orbit","content":"Moons circle planets","description":"Astronomy"}]} see [1] and [2]"#;
        let records = parse_records(content).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["title"], "Orbit");
    }

    #[test]
    fn test_fenced_payload() {
        let content = "```json\n{\"knowledge_points\": [{\"title\":\"T\",\"content\":\"C\",\"description\":\"D\"}]}\n```";
        let records = parse_records(content).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_control_characters_inside_strings() {
        let content = "{\"knowledge_points\":[{\"title\":\"Line\nbreak\",\"content\":\"tab\there\",\"description\":\"d\"}]}";
        let records = parse_records(content).unwrap();
        let candidates = validate_records(&records);
        assert_eq!(candidates[0].title, "Linebreak");
        assert_eq!(candidates[0].content, "tabhere");
    }

    #[test]
    fn test_unrecoverable_payload() {
        assert!(parse_records("I could not find any knowledge points.").is_none());
        assert!(parse_records(r#"{"knowledge_points": [oops"#).is_none());
        assert!(parse_records("").is_none());
    }

    #[test]
    fn test_invalid_records_are_discarded() {
        let records = vec![
            json!({"title": "ok", "content": "ok", "description": "ok"}),
            json!({"title": "missing content", "description": "d"}),
            json!({"title": 3, "content": "c", "description": "d"}),
            json!("not an object"),
        ];
        let candidates = validate_records(&records);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title, "ok");
    }

    #[test]
    fn test_record_cap() {
        let records: Vec<Value> = (0..8)
            .map(|i| json!({"title": format!("t{i}"), "content": "c", "description": "d"}))
            .collect();
        let candidates = validate_records(&records);
        assert_eq!(candidates.len(), MAX_MODEL_POINTS);
        assert_eq!(candidates[4].title, "t4");
    }

    #[test]
    fn test_finalize_truncates_and_numbers() {
        let long_title = "x".repeat(55);
        let candidates = vec![
            Candidate {
                title: long_title,
                content: "c1".to_string(),
                description: "d1".to_string(),
            },
            Candidate {
                title: "short".to_string(),
                content: "c2".to_string(),
                description: "d2".to_string(),
            },
        ];
        let at = Utc::now();
        let points = finalize(candidates, at);

        assert_eq!(points[0].title, format!("{}...", "x".repeat(40)));
        assert_eq!(points[0].id, point_id(at, 0));
        assert_eq!(points[1].id, point_id(at, 1));
        assert!(points.iter().all(|p| !p.selected && !p.saved));
    }
}
