//! Local sentence segmentation used when the model cannot be used.
//!
//! Deterministic and offline: the last resort of every extraction.

use chrono::{DateTime, Utc};
use kpoint_core::{KnowledgePoint, point_id};

/// Segments with fewer characters than this are dropped.
pub const MIN_SEGMENT_CHARS: usize = 10;

const SENTENCE_TERMINATORS: [char; 3] = ['.', '!', '?'];

/// Split `text` on `.`, `!` and `?`, trimming each piece and keeping those of
/// at least [`MIN_SEGMENT_CHARS`] characters.
pub fn split_sentences(text: &str) -> Vec<&str> {
    text.split(SENTENCE_TERMINATORS)
        .map(str::trim)
        .filter(|segment| segment.chars().count() >= MIN_SEGMENT_CHARS)
        .collect()
}

/// Short gloss built from the first three words of a segment.
pub fn describe(segment: &str) -> String {
    let lead = segment.split(' ').take(3).collect::<Vec<_>>().join(" ");
    format!("This concept relates to {lead}...")
}

/// One knowledge point per surviving sentence. May be empty.
pub fn fallback_points(text: &str, generated_at: DateTime<Utc>) -> Vec<KnowledgePoint> {
    split_sentences(text)
        .into_iter()
        .enumerate()
        .map(|(ordinal, segment)| {
            KnowledgePoint::new(
                point_id(generated_at, ordinal),
                segment,
                segment,
                describe(segment),
            )
        })
        .collect()
}
