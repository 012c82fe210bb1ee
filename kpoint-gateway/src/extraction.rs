//! LLM-backed knowledge point extraction.
//!
//! One request per extraction, no retries. Anything short of a usable model
//! answer degrades to local sentence splitting; only a too-short input and a
//! concurrent extraction are reported to the caller.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use kpoint_core::LlmSettings;
use kpoint_knowledge::{Extraction, InputTooShort, check_input, extraction_from_model};
use tracing::{info, warn};

use crate::providers::{CompletionProvider, CompletionRequest};

pub const EXTRACTION_SYSTEM_PROMPT: &str = "You are a knowledge extraction assistant. \
Read the user's text and extract between 1 and 5 key knowledge points. \
Respond with a single JSON object and nothing else, in exactly this shape: \
{\"knowledge_points\": [{\"title\": \"short title\", \"content\": \"the knowledge point itself\", \
\"description\": \"one sentence of context\"}]}. \
Every field must be a string.";

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error(transparent)]
    InputTooShort(#[from] InputTooShort),
    #[error("an extraction is already in progress")]
    InProgress,
}

/// Holds the in-progress flag for one extraction; clears it when dropped.
#[must_use]
pub struct ExtractionPermit<'a>(&'a AtomicBool);

impl Drop for ExtractionPermit<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ExtractionClient {
    provider: Arc<dyn CompletionProvider>,
    temperature: f64,
    max_tokens: u32,
    in_progress: AtomicBool,
}

impl ExtractionClient {
    pub fn new(provider: Arc<dyn CompletionProvider>, settings: &LlmSettings) -> Self {
        Self {
            provider,
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            in_progress: AtomicBool::new(false),
        }
    }

    pub fn is_extracting(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// Extract knowledge points from `raw_text`.
    ///
    /// An empty batch is a successful result.
    pub async fn extract(&self, raw_text: &str) -> Result<Extraction, ExtractionError> {
        let permit = self.begin(raw_text)?;
        Ok(self.run(permit, raw_text).await)
    }

    /// Check the input and take the in-progress flag.
    pub fn begin(&self, raw_text: &str) -> Result<ExtractionPermit<'_>, ExtractionError> {
        check_input(raw_text)?;

        if self
            .in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ExtractionError::InProgress);
        }
        Ok(ExtractionPermit(&self.in_progress))
    }

    /// Run an extraction started with [`begin`](Self::begin).
    pub async fn run(&self, _permit: ExtractionPermit<'_>, raw_text: &str) -> Extraction {
        let request = CompletionRequest::new(raw_text, self.temperature, self.max_tokens)
            .with_system(EXTRACTION_SYSTEM_PROMPT)
            .with_json_mode();

        info!(
            provider = self.provider.name(),
            model = self.provider.model(),
            chars = raw_text.chars().count(),
            "requesting knowledge point extraction"
        );

        let generated_at = Utc::now();
        match self.provider.complete(request).await {
            Ok(response) => {
                if response.text.is_none() {
                    warn!("completion had no message content, using fallback extraction");
                }
                extraction_from_model(response.text.as_deref(), raw_text, generated_at)
            }
            Err(e) => {
                warn!(error = %e, "extraction request failed, using fallback extraction");
                extraction_from_model(None, raw_text, generated_at)
            }
        }
    }
}
