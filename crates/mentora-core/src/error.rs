use crate::llm::LlmError;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum MentoraError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to extract text: {0}")]
    Parse(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Document not found or not ready")]
    NotReady,
    #[error("Quiz already completed")]
    AlreadyCompleted,
    #[error("Quiz not completed")]
    NotCompleted,
    #[error("{0}")]
    InvalidInput(String),
}

pub type Result<T, E = MentoraError> = std::result::Result<T, E>;

impl Serialize for MentoraError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
