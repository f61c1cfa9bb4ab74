pub mod ai;
pub mod chat;
pub mod documents;
pub mod flashcards;
pub mod quizzes;
pub mod settings;

/// Commands report failures to the frontend as display strings.
pub(crate) fn to_message(e: impl std::fmt::Display) -> String {
    e.to_string()
}
