//! kpoint-knowledge: the extraction and retrieval pipeline, without I/O.
//!
//! - Sentence fallback extractor and model-response repair
//! - Knowledge store (batch, selection, saved set)
//! - Keyword responder and chat log
//! - Point detail view

pub mod chat;
pub mod detail;
pub mod errors;
pub mod extraction;
pub mod fallback;
pub mod parse;
pub mod responder;
pub mod store;

pub use chat::{ChatLog, TurnState};
pub use detail::PointDetail;
pub use errors::{InputTooShort, KnowledgeError, KnowledgeResult};
pub use extraction::{
    Extraction, ExtractionSource, MIN_INPUT_CHARS, check_input, extraction_from_model,
    fallback_extraction,
};
pub use fallback::{fallback_points, split_sentences};
pub use parse::MAX_MODEL_POINTS;
pub use responder::{NO_MATCH_REPLY, find_match, respond, reply_text};
pub use store::KnowledgeStore;
