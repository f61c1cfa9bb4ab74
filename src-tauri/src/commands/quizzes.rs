use super::to_message;
use mentora_core::db::models::{Quiz, SubmittedAnswer};
use mentora_core::quiz::{self, QuizResults, QuizSubmission};
use mentora_core::{Database, Tutor};
use tauri::State;

#[tauri::command]
pub async fn generate_quiz(
    db: State<'_, Database>,
    document_id: String,
    num_questions: Option<usize>,
    title: Option<String>,
    model: Option<String>,
) -> Result<Quiz, String> {
    let tutor = Tutor::from_settings(&db, model.as_deref()).map_err(to_message)?;
    tutor
        .generate_quiz(&db, &document_id, num_questions, title.as_deref())
        .await
        .map_err(to_message)
}

#[tauri::command]
pub fn list_quizzes(db: State<'_, Database>, document_id: String) -> Result<Vec<Quiz>, String> {
    db.list_quizzes(&document_id).map_err(to_message)
}

#[tauri::command]
pub fn get_quiz(db: State<'_, Database>, id: String) -> Result<Quiz, String> {
    db.get_quiz(&id).map_err(to_message)
}

#[tauri::command]
pub fn delete_quiz(db: State<'_, Database>, id: String) -> Result<(), String> {
    db.delete_quiz(&id).map_err(to_message)
}

#[tauri::command]
pub fn submit_quiz(
    db: State<'_, Database>,
    id: String,
    answers: Vec<SubmittedAnswer>,
) -> Result<QuizSubmission, String> {
    quiz::submit_quiz(&db, &id, &answers).map_err(to_message)
}

#[tauri::command]
pub fn get_quiz_results(db: State<'_, Database>, id: String) -> Result<QuizResults, String> {
    quiz::quiz_results(&db, &id).map_err(to_message)
}
