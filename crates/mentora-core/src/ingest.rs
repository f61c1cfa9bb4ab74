use crate::config::StudyConfig;
use crate::db::models::{Document, DocumentStatus};
use crate::db::Database;
use crate::doc_processor::{chunk_text, file_extension, parse_file, SUPPORTED_EXTENSIONS};
use crate::error::{MentoraError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Copy `source` into the library directory and register it as a document in
/// the processing state. Text extraction happens separately in [`process_document`].
pub fn import_document(db: &Database, library_dir: &Path, source: &Path, title: &str) -> Result<Document> {
    let title = title.trim();
    if title.is_empty() {
        return Err(MentoraError::InvalidInput("Please provide a document title".into()));
    }
    let ext = file_extension(source);
    if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(MentoraError::InvalidInput(format!(
            "Unsupported file type: .{ext}"
        )));
    }
    let file_name = source
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| MentoraError::InvalidInput("Invalid file path".into()))?;

    fs::create_dir_all(library_dir)?;
    let stored: PathBuf = library_dir.join(format!("{}.{ext}", uuid::Uuid::new_v4()));
    let size = fs::copy(source, &stored)?;

    let document = db.create_document(
        title,
        file_name,
        &ext,
        &stored.to_string_lossy(),
        i64::try_from(size).ok(),
    );
    if document.is_err() {
        let _ = fs::remove_file(&stored);
    }
    let document = document?;
    info!(id = %document.id, file_name, size, "imported document");
    Ok(document)
}

/// Extract, chunk and store a document's text. Returns the number of chunks.
pub fn ingest(db: &Database, config: &StudyConfig, document_id: &str, path: &Path) -> Result<usize> {
    let parsed = parse_file(path)?;
    let chunks = chunk_text(&parsed.content, config.chunk_size, config.chunk_overlap);
    db.store_extraction(document_id, &parsed.content, &chunks)?;
    Ok(chunks.len())
}

/// Run [`ingest`] and settle the document's status. Failures are logged
/// and leave the document marked failed.
pub fn process_document(db: &Database, config: &StudyConfig, document_id: &str, path: &Path) -> DocumentStatus {
    match ingest(db, config, document_id, path) {
        Ok(chunks) => {
            info!(document_id, chunks, "document ready");
            DocumentStatus::Ready
        }
        Err(e) => {
            warn!(document_id, error = %e, "document processing failed");
            if let Err(e) = db.set_document_status(document_id, DocumentStatus::Failed) {
                warn!(document_id, error = %e, "could not mark document failed");
            }
            DocumentStatus::Failed
        }
    }
}

/// Delete a document, its derived data and its stored file.
pub fn remove_document(db: &Database, document_id: &str) -> Result<()> {
    let path = db.delete_document(document_id)?;
    if let Err(e) = fs::remove_file(&path) {
        warn!(document_id, path = %path, error = %e, "stored file was not removed");
    }
    info!(document_id, "deleted document");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn small_chunks() -> StudyConfig {
        StudyConfig {
            chunk_size: 4,
            chunk_overlap: 1,
            ..StudyConfig::default()
        }
    }

    #[test]
    fn test_import_and_process() {
        let dir = tempfile::tempdir().unwrap();
        let source = write(dir.path(), "cells.txt", "one two three four five six seven");
        let db = Database::in_memory().unwrap();
        let library = dir.path().join("documents");

        let doc = import_document(&db, &library, &source, " Cells ").unwrap();
        assert_eq!(doc.title, "Cells");
        assert_eq!(doc.file_name, "cells.txt");
        assert_eq!(doc.status, DocumentStatus::Processing);
        assert_eq!(doc.file_size, Some(33));
        assert!(Path::new(&doc.file_path).starts_with(&library));

        let status = process_document(&db, &small_chunks(), &doc.id, Path::new(&doc.file_path));
        assert_eq!(status, DocumentStatus::Ready);
        assert_eq!(db.get_chunks(&doc.id).unwrap().len(), 2);
        let (_, text) = db.get_ready_document(&doc.id).unwrap();
        assert!(text.starts_with("one two"));
    }

    #[test]
    fn test_import_rejects_bad_input() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::in_memory().unwrap();
        let docx = write(dir.path(), "notes.docx", "x");
        let txt = write(dir.path(), "notes.txt", "x");

        assert!(matches!(
            import_document(&db, dir.path(), &docx, "Notes"),
            Err(MentoraError::InvalidInput(_))
        ));
        assert!(matches!(
            import_document(&db, dir.path(), &txt, "  "),
            Err(MentoraError::InvalidInput(_))
        ));
        assert!(db.list_documents().unwrap().is_empty());
    }

    #[test]
    fn test_blank_document_is_ready_with_no_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::in_memory().unwrap();
        let source = write(dir.path(), "blank.txt", "  \n ");
        let doc = import_document(&db, dir.path(), &source, "Blank").unwrap();

        let status = process_document(&db, &StudyConfig::default(), &doc.id, Path::new(&doc.file_path));
        assert_eq!(status, DocumentStatus::Ready);
        assert_eq!(db.get_document(&doc.id).unwrap().status, DocumentStatus::Ready);
        assert!(db.get_chunks(&doc.id).unwrap().is_empty());
        assert!(db.get_ready_document(&doc.id).is_ok());
    }

    #[test]
    fn test_missing_file_marks_failed() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::in_memory().unwrap();
        let source = write(dir.path(), "gone.txt", "text");
        let doc = import_document(&db, dir.path(), &source, "Gone").unwrap();
        fs::remove_file(&doc.file_path).unwrap();

        let status = process_document(&db, &StudyConfig::default(), &doc.id, Path::new(&doc.file_path));
        assert_eq!(status, DocumentStatus::Failed);
        assert!(matches!(
            db.get_ready_document(&doc.id),
            Err(MentoraError::NotReady)
        ));
    }

    #[test]
    fn test_processing_again_replaces_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::in_memory().unwrap();
        let source = write(dir.path(), "a.txt", "one two three four five six seven");
        let doc = import_document(&db, dir.path(), &source, "A").unwrap();
        process_document(&db, &small_chunks(), &doc.id, Path::new(&doc.file_path));

        let status = process_document(&db, &StudyConfig::default(), &doc.id, Path::new(&doc.file_path));
        assert_eq!(status, DocumentStatus::Ready);
        assert_eq!(db.get_chunks(&doc.id).unwrap().len(), 1);
    }

    #[test]
    fn test_remove_document_deletes_file() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::in_memory().unwrap();
        let source = write(dir.path(), "a.txt", "text");
        let doc = import_document(&db, &dir.path().join("lib"), &source, "A").unwrap();

        remove_document(&db, &doc.id).unwrap();
        assert!(!Path::new(&doc.file_path).exists());
        assert!(source.exists());
        assert!(matches!(
            remove_document(&db, &doc.id),
            Err(MentoraError::NotFound(_))
        ));
    }
}
