use super::to_message;
use mentora_core::study::{Explanation, Summary};
use mentora_core::{Database, Tutor};
use tauri::State;

#[tauri::command]
pub async fn generate_summary(
    db: State<'_, Database>,
    document_id: String,
    model: Option<String>,
) -> Result<Summary, String> {
    let tutor = Tutor::from_settings(&db, model.as_deref()).map_err(to_message)?;
    tutor
        .generate_summary(&db, &document_id)
        .await
        .map_err(to_message)
}

#[tauri::command]
pub async fn explain_concept(
    db: State<'_, Database>,
    document_id: String,
    concept: String,
    model: Option<String>,
) -> Result<Explanation, String> {
    let tutor = Tutor::from_settings(&db, model.as_deref()).map_err(to_message)?;
    tutor
        .explain_concept(&db, &document_id, &concept)
        .await
        .map_err(to_message)
}
