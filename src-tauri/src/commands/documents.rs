use super::to_message;
use mentora_core::db::models::{Chunk, Document, DocumentStatus};
use mentora_core::{ingest, Database, StudyConfig};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tauri::{AppHandle, Emitter, Manager, State};

#[derive(Clone, Serialize)]
struct DocumentStatusEvent {
    document_id: String,
    status: DocumentStatus,
}

fn library_dir(app: &AppHandle) -> Result<PathBuf, String> {
    Ok(app.path().app_data_dir().map_err(to_message)?.join("documents"))
}

/// Extract and chunk in the background, then tell the frontend how it went.
fn spawn_ingest(app: &AppHandle, config: StudyConfig, document_id: String, path: PathBuf) {
    let app = app.clone();
    tauri::async_runtime::spawn_blocking(move || {
        let db = app.state::<Database>();
        let status = ingest::process_document(&db, &config, &document_id, &path);
        if let Err(e) = app.emit(
            "document-status",
            DocumentStatusEvent {
                document_id,
                status,
            },
        ) {
            tracing::warn!(error = %e, "failed to emit document status");
        }
    });
}

#[tauri::command]
pub fn import_document(
    app: AppHandle,
    db: State<'_, Database>,
    file_path: String,
    title: String,
) -> Result<Document, String> {
    let config = StudyConfig::load(&db).map_err(to_message)?;
    let document = ingest::import_document(&db, &library_dir(&app)?, Path::new(&file_path), &title)
        .map_err(to_message)?;
    spawn_ingest(
        &app,
        config,
        document.id.clone(),
        PathBuf::from(&document.file_path),
    );
    Ok(document)
}

#[tauri::command]
pub fn reprocess_document(
    app: AppHandle,
    db: State<'_, Database>,
    id: String,
) -> Result<Document, String> {
    let config = StudyConfig::load(&db).map_err(to_message)?;
    db.set_document_status(&id, DocumentStatus::Processing)
        .map_err(to_message)?;
    let document = db.get_document(&id).map_err(to_message)?;
    spawn_ingest(&app, config, id, PathBuf::from(&document.file_path));
    Ok(document)
}

#[tauri::command]
pub fn list_documents(db: State<'_, Database>) -> Result<Vec<Document>, String> {
    db.list_documents().map_err(to_message)
}

#[tauri::command]
pub fn get_document(db: State<'_, Database>, id: String) -> Result<Document, String> {
    db.touch_document(&id).map_err(to_message)?;
    db.get_document(&id).map_err(to_message)
}

#[tauri::command]
pub fn get_document_chunks(db: State<'_, Database>, id: String) -> Result<Vec<Chunk>, String> {
    db.get_document(&id).map_err(to_message)?;
    db.get_chunks(&id).map_err(to_message)
}

#[tauri::command]
pub fn delete_document(db: State<'_, Database>, id: String) -> Result<(), String> {
    ingest::remove_document(&db, &id).map_err(to_message)
}
