/// Input rejected before extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("input too short: need at least {min} non-whitespace characters, got {actual}")]
pub struct InputTooShort {
    pub min: usize,
    pub actual: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum KnowledgeError {
    #[error("unknown knowledge point: {0}")]
    UnknownPoint(String),
    #[error("query is empty")]
    EmptyQuery,
}

pub type KnowledgeResult<T> = Result<T, KnowledgeError>;
