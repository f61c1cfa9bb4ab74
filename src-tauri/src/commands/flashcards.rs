use super::to_message;
use mentora_core::db::models::{Flashcard, FlashcardSet};
use mentora_core::{Database, Tutor};
use tauri::State;

#[tauri::command]
pub async fn generate_flashcards(
    db: State<'_, Database>,
    document_id: String,
    count: Option<usize>,
    model: Option<String>,
) -> Result<FlashcardSet, String> {
    let tutor = Tutor::from_settings(&db, model.as_deref()).map_err(to_message)?;
    tutor
        .generate_flashcards(&db, &document_id, count)
        .await
        .map_err(to_message)
}

#[tauri::command]
pub fn list_flashcard_sets(db: State<'_, Database>) -> Result<Vec<FlashcardSet>, String> {
    db.list_flashcard_sets(None).map_err(to_message)
}

#[tauri::command]
pub fn get_flashcard_sets(
    db: State<'_, Database>,
    document_id: String,
) -> Result<Vec<FlashcardSet>, String> {
    db.list_flashcard_sets(Some(&document_id)).map_err(to_message)
}

#[tauri::command]
pub fn get_flashcard_set(db: State<'_, Database>, id: String) -> Result<FlashcardSet, String> {
    db.get_flashcard_set(&id).map_err(to_message)
}

#[tauri::command]
pub fn delete_flashcard_set(db: State<'_, Database>, id: String) -> Result<(), String> {
    db.delete_flashcard_set(&id).map_err(to_message)
}

#[tauri::command]
pub fn review_flashcard(db: State<'_, Database>, card_id: String) -> Result<Flashcard, String> {
    db.review_flashcard(&card_id).map_err(to_message)
}

#[tauri::command]
pub fn toggle_star_flashcard(
    db: State<'_, Database>,
    card_id: String,
) -> Result<Flashcard, String> {
    db.toggle_star(&card_id).map_err(to_message)
}
