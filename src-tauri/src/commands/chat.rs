use super::to_message;
use mentora_core::db::models::ChatRecord;
use mentora_core::llm::StreamChunk;
use mentora_core::study::ChatAnswer;
use mentora_core::{Database, Tutor};
use serde::Serialize;
use tauri::{AppHandle, Emitter, State};

#[derive(Clone, Serialize)]
struct ChatStreamEvent {
    document_id: String,
    delta: String,
    done: bool,
}

#[tauri::command]
pub async fn chat_with_document(
    app: AppHandle,
    db: State<'_, Database>,
    document_id: String,
    question: String,
    model: Option<String>,
) -> Result<ChatAnswer, String> {
    let tutor = Tutor::from_settings(&db, model.as_deref()).map_err(to_message)?;

    let doc_id = document_id.clone();
    tutor
        .chat(&db, &document_id, &question, |chunk: StreamChunk| {
            let _ = app.emit(
                "chat-stream",
                ChatStreamEvent {
                    document_id: doc_id.clone(),
                    delta: chunk.delta,
                    done: chunk.done,
                },
            );
        })
        .await
        .map_err(to_message)
}

#[tauri::command]
pub fn get_chat_history(
    db: State<'_, Database>,
    document_id: String,
) -> Result<Vec<ChatRecord>, String> {
    db.get_chat_history(&document_id).map_err(to_message)
}

#[tauri::command]
pub fn clear_chat_history(db: State<'_, Database>, document_id: String) -> Result<usize, String> {
    db.clear_chat_history(&document_id).map_err(to_message)
}
