use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of characters shown in a point title.
pub const TITLE_MAX_CHARS: usize = 40;

/// Marker appended to titles cut at [`TITLE_MAX_CHARS`].
pub const TITLE_ELLIPSIS: &str = "...";

/// An atomic extracted fact or idea.
///
/// Field names serialize in camelCase so collections written by the browser
/// build of the tool load unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgePoint {
    pub id: String,
    pub title: String,
    pub content: String,
    pub description: String,
    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub saved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl KnowledgePoint {
    /// Create an unsaved, unselected point. The title is truncated to
    /// [`TITLE_MAX_CHARS`].
    pub fn new(
        id: impl Into<String>,
        title: &str,
        content: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: truncate_title(title),
            content: content.into(),
            description: description.into(),
            selected: false,
            saved: false,
            timestamp: None,
        }
    }

    /// Copy of this point promoted into the saved set at `now`.
    pub fn saved_copy(&self, now: DateTime<Utc>) -> Self {
        Self {
            saved: true,
            timestamp: Some(now),
            ..self.clone()
        }
    }

    /// Case-insensitive substring match against title or content.
    pub fn matches(&self, needle_lower: &str) -> bool {
        self.title.to_lowercase().contains(needle_lower)
            || self.content.to_lowercase().contains(needle_lower)
    }
}

/// Cut a title to [`TITLE_MAX_CHARS`] characters, appending an ellipsis when
/// anything was dropped. Counts characters, not bytes.
pub fn truncate_title(title: &str) -> String {
    match title.char_indices().nth(TITLE_MAX_CHARS) {
        Some((byte_idx, _)) => format!("{}{}", &title[..byte_idx], TITLE_ELLIPSIS),
        None => title.to_string(),
    }
}

/// Build the id of the `ordinal`-th point of a batch generated at `generated_at`.
pub fn point_id(generated_at: DateTime<Utc>, ordinal: usize) -> String {
    format!("kp-{}-{}", generated_at.timestamp_millis(), ordinal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_short_title_unchanged() {
        assert_eq!(truncate_title("Newton's Laws"), "Newton's Laws");
        let exact = "a".repeat(TITLE_MAX_CHARS);
        assert_eq!(truncate_title(&exact), exact);
    }

    #[test]
    fn test_long_title_truncated_with_ellipsis() {
        let long = "b".repeat(TITLE_MAX_CHARS + 7);
        let truncated = truncate_title(&long);
        assert_eq!(truncated, format!("{}...", "b".repeat(TITLE_MAX_CHARS)));
    }

    #[test]
    fn test_truncation_counts_characters() {
        let long = "é".repeat(45);
        let truncated = truncate_title(&long);
        assert_eq!(truncated.chars().count(), TITLE_MAX_CHARS + TITLE_ELLIPSIS.len());
        assert!(truncated.starts_with(&"é".repeat(TITLE_MAX_CHARS)));
    }

    #[test]
    fn test_point_id_format() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(point_id(at, 2), "kp-1700000000123-2");
    }

    #[test]
    fn test_saved_copy_stamps_timestamp() {
        let point = KnowledgePoint::new("kp-1-0", "Title", "Content", "Desc");
        let now = Utc::now();
        let saved = point.saved_copy(now);
        assert!(saved.saved);
        assert_eq!(saved.timestamp, Some(now));
        assert_eq!(saved.id, point.id);
        assert!(!point.saved);
    }

    #[test]
    fn test_serializes_camel_case_without_timestamp() {
        let point = KnowledgePoint::new("kp-1-0", "Title", "Content", "Desc");
        let json = serde_json::to_value(&point).unwrap();
        assert_eq!(json["id"], "kp-1-0");
        assert_eq!(json["selected"], false);
        assert!(json.get("timestamp").is_none());
    }

    #[test]
    fn test_deserializes_browser_record() {
        let raw = r#"{"id":"kp-1-0","title":"T","content":"C","description":"D",
            "selected":false,"saved":true,"timestamp":"2024-03-01T10:00:00.000Z"}"#;
        let point: KnowledgePoint = serde_json::from_str(raw).unwrap();
        assert!(point.saved);
        assert_eq!(
            point.timestamp,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap())
        );
    }
}
