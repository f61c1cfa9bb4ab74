use crate::resolver::{AnswerValue, ResolvedIndex};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Processing,
    Ready,
    Failed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Processing => "processing",
            DocumentStatus::Ready => "ready",
            DocumentStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "ready" => DocumentStatus::Ready,
            "failed" => DocumentStatus::Failed,
            _ => DocumentStatus::Processing,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub file_name: String,
    pub file_type: String,
    pub file_path: String,
    pub file_size: Option<i64>,
    pub status: DocumentStatus,
    pub flashcard_count: u32,
    pub quiz_count: u32,
    pub last_accessed: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub chunk_index: u32,
    pub page_number: u32,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Flashcard {
    pub id: String,
    pub set_id: String,
    pub question: String,
    pub answer: String,
    pub difficulty: String,
    pub review_count: u32,
    pub last_reviewed: Option<String>,
    pub is_starred: bool,
}

/// A card before it is saved.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FlashcardDraft {
    pub question: String,
    pub answer: String,
    #[serde(default = "default_difficulty")]
    pub difficulty: String,
}

pub(crate) fn default_difficulty() -> String {
    "medium".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FlashcardSet {
    pub id: String,
    pub document_id: String,
    pub document_title: String,
    pub cards: Vec<Flashcard>,
    /// Percentage of cards reviewed at least once.
    pub progress: u32,
    pub created_at: String,
}

/// Share of cards reviewed at least once, as a rounded percentage.
pub fn review_progress(cards: &[Flashcard]) -> u32 {
    if cards.is_empty() {
        return 0;
    }
    let reviewed = cards.iter().filter(|c| c.review_count > 0).count();
    (reviewed as f64 / cards.len() as f64 * 100.0).round() as u32
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    /// Answer as the generator produced it.
    pub correct_answer: AnswerValue,
    /// Canonical option index, decided when the quiz is stored.
    pub correct_index: ResolvedIndex,
    pub explanation: String,
    pub difficulty: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SubmittedAnswer {
    pub question_index: i64,
    pub selected_answer: AnswerValue,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ResolvedAnswer {
    pub question_index: usize,
    pub selected_answer: AnswerValue,
    pub selected_index: ResolvedIndex,
    pub is_correct: bool,
    pub answered_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Quiz {
    pub id: String,
    pub document_id: String,
    pub title: String,
    pub questions: Vec<QuizQuestion>,
    pub total_questions: u32,
    pub user_answers: Vec<ResolvedAnswer>,
    pub score: u32,
    pub completed_at: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatRecord {
    pub id: String,
    pub document_id: String,
    pub role: String,
    pub content: String,
    pub relevant_chunks: Vec<u32>,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(review_count: u32) -> Flashcard {
        Flashcard {
            id: "c".into(),
            set_id: "s".into(),
            question: "q".into(),
            answer: "a".into(),
            difficulty: "easy".into(),
            review_count,
            last_reviewed: None,
            is_starred: false,
        }
    }

    #[test]
    fn test_review_progress() {
        assert_eq!(review_progress(&[]), 0);
        assert_eq!(review_progress(&[card(1), card(0), card(3)]), 67);
        assert_eq!(review_progress(&[card(2)]), 100);
    }

    #[test]
    fn test_document_status_round_trip() {
        for status in [
            DocumentStatus::Processing,
            DocumentStatus::Ready,
            DocumentStatus::Failed,
        ] {
            assert_eq!(DocumentStatus::parse(status.as_str()), status);
        }
    }
}
