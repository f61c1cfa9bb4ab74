use crate::db::Database;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::warn;

pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

/// Study parameters used by ingestion, retrieval and generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyConfig {
    /// Words per chunk.
    pub chunk_size: usize,
    /// Words shared by adjacent chunks.
    pub chunk_overlap: usize,
    /// Chunks sent to the model for chat and explanations.
    pub context_chunks: usize,
    pub flashcard_count: usize,
    pub quiz_questions: usize,
    pub default_model: String,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
            context_chunks: 3,
            flashcard_count: 10,
            quiz_questions: 10,
            default_model: DEFAULT_MODEL.to_string(),
        }
    }
}

fn numeric_setting<T: FromStr>(db: &Database, key: &str, fallback: T) -> Result<T> {
    match db.get_setting(key)? {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => Ok(value),
            Err(_) => {
                warn!(key, value = %raw, "ignoring malformed setting");
                Ok(fallback)
            }
        },
        None => Ok(fallback),
    }
}

impl StudyConfig {
    /// Read study settings, falling back to defaults for missing or malformed values.
    pub fn load(db: &Database) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            chunk_size: numeric_setting(db, "chunk_size", defaults.chunk_size)?.max(1),
            chunk_overlap: numeric_setting(db, "chunk_overlap", defaults.chunk_overlap)?,
            context_chunks: numeric_setting(db, "context_chunks", defaults.context_chunks)?,
            flashcard_count: numeric_setting(db, "flashcard_count", defaults.flashcard_count)?,
            quiz_questions: numeric_setting(db, "quiz_questions", defaults.quiz_questions)?,
            default_model: db
                .get_setting("default_model")?
                .filter(|m| !m.trim().is_empty())
                .unwrap_or(defaults.default_model),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_unset() {
        let db = Database::in_memory().unwrap();
        assert_eq!(StudyConfig::load(&db).unwrap(), StudyConfig::default());
    }

    #[test]
    fn test_reads_overrides_and_ignores_garbage() {
        let db = Database::in_memory().unwrap();
        db.set_setting("chunk_size", " 200 ").unwrap();
        db.set_setting("chunk_overlap", "lots").unwrap();
        db.set_setting("default_model", "claude/claude-sonnet-4-20250514")
            .unwrap();

        let config = StudyConfig::load(&db).unwrap();
        assert_eq!(config.chunk_size, 200);
        assert_eq!(config.chunk_overlap, 50);
        assert_eq!(config.default_model, "claude/claude-sonnet-4-20250514");
    }
}
