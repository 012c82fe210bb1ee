use chrono::{DateTime, Utc};
use kpoint_core::KnowledgePoint;
use serde::Serialize;
use tracing::{info, warn};

use crate::errors::InputTooShort;
use crate::fallback::fallback_points;
use crate::parse::{finalize, parse_records, validate_records};

/// Inputs with fewer non-whitespace characters are rejected before any
/// request is made.
pub const MIN_INPUT_CHARS: usize = 2;

/// Which path produced an extraction batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionSource {
    Model,
    Fallback,
}

/// A freshly extracted batch. An empty batch is a normal outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Extraction {
    pub points: Vec<KnowledgePoint>,
    pub source: ExtractionSource,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

pub fn check_input(text: &str) -> Result<(), InputTooShort> {
    let actual = text.chars().filter(|c| !c.is_whitespace()).count();
    if actual < MIN_INPUT_CHARS {
        return Err(InputTooShort {
            min: MIN_INPUT_CHARS,
            actual,
        });
    }
    Ok(())
}

/// Sentence-split `raw_text` locally.
pub fn fallback_extraction(raw_text: &str, generated_at: DateTime<Utc>) -> Extraction {
    let points = fallback_points(raw_text, generated_at);
    info!(count = points.len(), "fallback extraction produced points");
    Extraction {
        points,
        source: ExtractionSource::Fallback,
    }
}

/// Turn model output into a batch, falling back to sentence splitting when
/// the output is missing, unparseable or has no valid records.
pub fn extraction_from_model(
    model_content: Option<&str>,
    raw_text: &str,
    generated_at: DateTime<Utc>,
) -> Extraction {
    let Some(content) = model_content else {
        return fallback_extraction(raw_text, generated_at);
    };

    let Some(records) = parse_records(content) else {
        warn!("model response could not be parsed, using fallback extraction");
        return fallback_extraction(raw_text, generated_at);
    };

    let candidates = validate_records(&records);
    if candidates.is_empty() {
        warn!(
            records = records.len(),
            "model response had no valid knowledge points, using fallback extraction"
        );
        return fallback_extraction(raw_text, generated_at);
    }

    let points = finalize(candidates, generated_at);
    info!(count = points.len(), "model extraction produced points");
    Extraction {
        points,
        source: ExtractionSource::Model,
    }
}
