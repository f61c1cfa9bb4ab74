pub mod models;

use crate::error::{MentoraError, Result};
use models::{
    review_progress, ChatRecord, Chunk, Document, DocumentStatus, Flashcard, FlashcardDraft, FlashcardSet, Quiz,
    QuizQuestion, ResolvedAnswer,
};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

const DOCUMENT_COLUMNS: &str = "d.id, d.title, d.file_name, d.file_type, d.file_path, d.file_size, d.status, \
     (SELECT COUNT(*) FROM flashcard_sets f WHERE f.document_id = d.id), \
     (SELECT COUNT(*) FROM quizzes q WHERE q.document_id = d.id), \
     d.last_accessed, d.created_at";

const QUIZ_COLUMNS: &str = "id, document_id, title, questions, total_questions, user_answers, score, completed_at, created_at";

const FLASHCARD_COLUMNS: &str =
    "id, set_id, question, answer, difficulty, review_count, last_reviewed, is_starred";

pub struct Database {
    conn: Mutex<Connection>,
}

fn document_from_row(row: &Row<'_>) -> rusqlite::Result<Document> {
    let status: String = row.get(6)?;
    Ok(Document {
        id: row.get(0)?,
        title: row.get(1)?,
        file_name: row.get(2)?,
        file_type: row.get(3)?,
        file_path: row.get(4)?,
        file_size: row.get(5)?,
        status: DocumentStatus::parse(&status),
        flashcard_count: row.get(7)?,
        quiz_count: row.get(8)?,
        last_accessed: row.get(9)?,
        created_at: row.get(10)?,
    })
}

fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn quiz_from_row(row: &Row<'_>) -> rusqlite::Result<Quiz> {
    Ok(Quiz {
        id: row.get(0)?,
        document_id: row.get(1)?,
        title: row.get(2)?,
        questions: json_column(row, 3)?,
        total_questions: row.get(4)?,
        user_answers: json_column(row, 5)?,
        score: row.get(6)?,
        completed_at: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn flashcard_from_row(row: &Row<'_>) -> rusqlite::Result<Flashcard> {
    Ok(Flashcard {
        id: row.get(0)?,
        set_id: row.get(1)?,
        question: row.get(2)?,
        answer: row.get(3)?,
        difficulty: row.get(4)?,
        review_count: row.get(5)?,
        last_reviewed: row.get(6)?,
        is_starred: row.get(7)?,
    })
}

fn chat_message_from_row(row: &Row<'_>) -> rusqlite::Result<ChatRecord> {
    Ok(ChatRecord {
        id: row.get(0)?,
        document_id: row.get(1)?,
        role: row.get(2)?,
        content: row.get(3)?,
        relevant_chunks: json_column(row, 4)?,
        created_at: row.get(5)?,
    })
}

impl Database {
    pub fn new(app_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(app_dir)?;
        let conn = Connection::open(app_dir.join("mentora.db"))?;
        Self::with_connection(conn)
    }

    /// Private database that lives as long as the handle.
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.lock();
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA foreign_keys=ON;

            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                file_name TEXT NOT NULL,
                file_type TEXT NOT NULL,
                file_path TEXT NOT NULL,
                file_size INTEGER,
                extracted_text TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL DEFAULT 'processing'
                    CHECK (status IN ('processing', 'ready', 'failed')),
                last_accessed TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS chunks (
                id TEXT PRIMARY KEY,
                document_id TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                page_number INTEGER NOT NULL DEFAULT 0,
                content TEXT NOT NULL,
                FOREIGN KEY (document_id) REFERENCES documents(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_chunks_document ON chunks(document_id, chunk_index);

            CREATE TABLE IF NOT EXISTS flashcard_sets (
                id TEXT PRIMARY KEY,
                document_id TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                FOREIGN KEY (document_id) REFERENCES documents(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS flashcards (
                id TEXT PRIMARY KEY,
                set_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                question TEXT NOT NULL,
                answer TEXT NOT NULL,
                difficulty TEXT NOT NULL DEFAULT 'medium',
                review_count INTEGER NOT NULL DEFAULT 0,
                last_reviewed TEXT,
                is_starred INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY (set_id) REFERENCES flashcard_sets(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS quizzes (
                id TEXT PRIMARY KEY,
                document_id TEXT NOT NULL,
                title TEXT NOT NULL,
                questions TEXT NOT NULL,
                total_questions INTEGER NOT NULL,
                user_answers TEXT NOT NULL DEFAULT '[]',
                score INTEGER NOT NULL DEFAULT 0,
                completed_at TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                FOREIGN KEY (document_id) REFERENCES documents(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS chat_messages (
                id TEXT PRIMARY KEY,
                document_id TEXT NOT NULL,
                role TEXT NOT NULL CHECK (role IN ('user', 'assistant')),
                content TEXT NOT NULL,
                relevant_chunks TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                FOREIGN KEY (document_id) REFERENCES documents(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    // ── Documents ──

    pub fn create_document(
        &self,
        title: &str,
        file_name: &str,
        file_type: &str,
        file_path: &str,
        file_size: Option<i64>,
    ) -> Result<Document> {
        let id = uuid::Uuid::new_v4().to_string();
        {
            let conn = self.lock();
            conn.execute(
                "INSERT INTO documents (id, title, file_name, file_type, file_path, file_size) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![id, title, file_name, file_type, file_path, file_size],
            )?;
        }
        self.get_document(&id)
    }

    pub fn get_document(&self, id: &str) -> Result<Document> {
        let conn = self.lock();
        conn.query_row(
            &format!("SELECT {DOCUMENT_COLUMNS} FROM documents d WHERE d.id = ?1"),
            params![id],
            document_from_row,
        )
        .optional()?
        .ok_or(MentoraError::NotFound("Document"))
    }

    /// Document that finished ingestion, with its extracted text.
    pub fn get_ready_document(&self, id: &str) -> Result<(Document, String)> {
        let document = match self.get_document(id) {
            Ok(doc) if doc.status == DocumentStatus::Ready => doc,
            Ok(_) | Err(MentoraError::NotFound(_)) => return Err(MentoraError::NotReady),
            Err(e) => return Err(e),
        };
        let conn = self.lock();
        let text: String = conn.query_row(
            "SELECT extracted_text FROM documents WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        Ok((document, text))
    }

    pub fn list_documents(&self) -> Result<Vec<Document>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents d ORDER BY d.created_at DESC, d.rowid DESC"
        ))?;
        let rows = stmt.query_map([], document_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn touch_document(&self, id: &str) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            "UPDATE documents SET last_accessed = datetime('now') WHERE id = ?1",
            params![id],
        )?;
        Ok(())
    }

    pub fn set_document_status(&self, id: &str, status: DocumentStatus) -> Result<()> {
        let conn = self.lock();
        let updated = conn.execute(
            "UPDATE documents SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id],
        )?;
        if updated == 0 {
            return Err(MentoraError::NotFound("Document"));
        }
        Ok(())
    }

    /// Replace the document's text and chunks and mark it ready, in one transaction.
    pub fn store_extraction(&self, id: &str, text: &str, chunks: &[Chunk]) -> Result<()> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM chunks WHERE document_id = ?1", params![id])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO chunks (id, document_id, chunk_index, page_number, content) VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for chunk in chunks {
                insert.execute(params![
                    uuid::Uuid::new_v4().to_string(),
                    id,
                    chunk.chunk_index,
                    chunk.page_number,
                    chunk.content
                ])?;
            }
        }
        let updated = tx.execute(
            "UPDATE documents SET extracted_text = ?1, status = 'ready' WHERE id = ?2",
            params![text, id],
        )?;
        if updated == 0 {
            return Err(MentoraError::NotFound("Document"));
        }
        tx.commit()?;
        Ok(())
    }

    pub fn get_chunks(&self, document_id: &str) -> Result<Vec<Chunk>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT chunk_index, page_number, content FROM chunks WHERE document_id = ?1 ORDER BY chunk_index ASC",
        )?;
        let rows = stmt.query_map(params![document_id], |row| {
            Ok(Chunk {
                chunk_index: row.get(0)?,
                page_number: row.get(1)?,
                content: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Delete a document and everything generated from it.
    /// Returns the stored file path so the caller can remove the file.
    pub fn delete_document(&self, id: &str) -> Result<String> {
        let conn = self.lock();
        let path: String = conn
            .query_row(
                "SELECT file_path FROM documents WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(MentoraError::NotFound("Document"))?;
        conn.execute("DELETE FROM documents WHERE id = ?1", params![id])?;
        Ok(path)
    }

    // ── Flashcards ──

    pub fn create_flashcard_set(
        &self,
        document_id: &str,
        cards: &[FlashcardDraft],
    ) -> Result<FlashcardSet> {
        let set_id = uuid::Uuid::new_v4().to_string();
        {
            let mut conn = self.lock();
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO flashcard_sets (id, document_id) VALUES (?1, ?2)",
                params![set_id, document_id],
            )?;
            {
                let mut insert = tx.prepare(
                    "INSERT INTO flashcards (id, set_id, position, question, answer, difficulty) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )?;
                for (position, card) in cards.iter().enumerate() {
                    insert.execute(params![
                        uuid::Uuid::new_v4().to_string(),
                        set_id,
                        position as i64,
                        card.question,
                        card.answer,
                        card.difficulty
                    ])?;
                }
            }
            tx.commit()?;
        }
        self.get_flashcard_set(&set_id)
    }

    fn load_cards(conn: &Connection, set_id: &str) -> rusqlite::Result<Vec<Flashcard>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {FLASHCARD_COLUMNS} FROM flashcards WHERE set_id = ?1 ORDER BY position ASC"
        ))?;
        let rows = stmt.query_map(params![set_id], flashcard_from_row)?;
        rows.collect()
    }

    fn load_sets(conn: &Connection, sql: &str, arg: Option<&str>) -> Result<Vec<FlashcardSet>> {
        let mut stmt = conn.prepare(sql)?;
        let map = |row: &Row<'_>| -> rusqlite::Result<(String, String, String, String)> {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        };
        let heads = match arg {
            Some(a) => stmt.query_map(params![a], map)?.collect::<rusqlite::Result<Vec<_>>>()?,
            None => stmt.query_map([], map)?.collect::<rusqlite::Result<Vec<_>>>()?,
        };
        heads
            .into_iter()
            .map(|(id, document_id, document_title, created_at)| -> Result<FlashcardSet> {
                let cards = Self::load_cards(conn, &id)?;
                Ok(FlashcardSet {
                    id,
                    document_id,
                    document_title,
                    progress: review_progress(&cards),
                    cards,
                    created_at,
                })
            })
            .collect()
    }

    pub fn get_flashcard_set(&self, id: &str) -> Result<FlashcardSet> {
        let conn = self.lock();
        Self::load_sets(
            &conn,
            "SELECT s.id, s.document_id, d.title, s.created_at FROM flashcard_sets s \
             JOIN documents d ON d.id = s.document_id WHERE s.id = ?1",
            Some(id),
        )?
        .pop()
        .ok_or(MentoraError::NotFound("Flashcard set"))
    }

    /// All flashcard sets, newest first, optionally limited to one document.
    pub fn list_flashcard_sets(&self, document_id: Option<&str>) -> Result<Vec<FlashcardSet>> {
        let conn = self.lock();
        let filter = if document_id.is_some() {
            "WHERE s.document_id = ?1"
        } else {
            ""
        };
        Self::load_sets(
            &conn,
            &format!(
                "SELECT s.id, s.document_id, d.title, s.created_at FROM flashcard_sets s \
                 JOIN documents d ON d.id = s.document_id {filter} \
                 ORDER BY s.created_at DESC, s.rowid DESC"
            ),
            document_id,
        )
    }

    pub fn delete_flashcard_set(&self, id: &str) -> Result<()> {
        let conn = self.lock();
        let deleted = conn.execute("DELETE FROM flashcard_sets WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(MentoraError::NotFound("Flashcard set"));
        }
        Ok(())
    }

    fn update_card(&self, card_id: &str, sql: &str) -> Result<Flashcard> {
        let conn = self.lock();
        let updated = conn.execute(sql, params![card_id])?;
        if updated == 0 {
            return Err(MentoraError::NotFound("Flashcard"));
        }
        Ok(conn.query_row(
            &format!("SELECT {FLASHCARD_COLUMNS} FROM flashcards WHERE id = ?1"),
            params![card_id],
            flashcard_from_row,
        )?)
    }

    pub fn review_flashcard(&self, card_id: &str) -> Result<Flashcard> {
        self.update_card(
            card_id,
            "UPDATE flashcards SET review_count = review_count + 1, last_reviewed = datetime('now') WHERE id = ?1",
        )
    }

    pub fn toggle_star(&self, card_id: &str) -> Result<Flashcard> {
        self.update_card(
            card_id,
            "UPDATE flashcards SET is_starred = NOT is_starred WHERE id = ?1",
        )
    }

    // ── Quizzes ──

    pub fn create_quiz(
        &self,
        document_id: &str,
        title: &str,
        questions: &[QuizQuestion],
    ) -> Result<Quiz> {
        let id = uuid::Uuid::new_v4().to_string();
        {
            let conn = self.lock();
            conn.execute(
                "INSERT INTO quizzes (id, document_id, title, questions, total_questions) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    id,
                    document_id,
                    title,
                    serde_json::to_string(questions)?,
                    questions.len() as i64
                ],
            )?;
        }
        self.get_quiz(&id)
    }

    pub fn get_quiz(&self, id: &str) -> Result<Quiz> {
        let conn = self.lock();
        conn.query_row(
            &format!("SELECT {QUIZ_COLUMNS} FROM quizzes WHERE id = ?1"),
            params![id],
            quiz_from_row,
        )
        .optional()?
        .ok_or(MentoraError::NotFound("Quiz"))
    }

    pub fn list_quizzes(&self, document_id: &str) -> Result<Vec<Quiz>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {QUIZ_COLUMNS} FROM quizzes WHERE document_id = ?1 ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt.query_map(params![document_id], quiz_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn delete_quiz(&self, id: &str) -> Result<()> {
        let conn = self.lock();
        let deleted = conn.execute("DELETE FROM quizzes WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(MentoraError::NotFound("Quiz"));
        }
        Ok(())
    }

    /// Record graded answers. Only the first call for a quiz succeeds.
    pub fn complete_quiz(&self, id: &str, answers: &[ResolvedAnswer], score: u32) -> Result<()> {
        let conn = self.lock();
        let updated = conn.execute(
            "UPDATE quizzes SET user_answers = ?1, score = ?2, completed_at = datetime('now') \
             WHERE id = ?3 AND completed_at IS NULL",
            params![serde_json::to_string(answers)?, score, id],
        )?;
        if updated == 0 {
            let exists = conn
                .query_row("SELECT 1 FROM quizzes WHERE id = ?1", params![id], |_| Ok(()))
                .optional()?
                .is_some();
            return Err(if exists {
                MentoraError::AlreadyCompleted
            } else {
                MentoraError::NotFound("Quiz")
            });
        }
        Ok(())
    }

    // ── Chat history ──

    pub fn add_chat_message(
        &self,
        document_id: &str,
        role: &str,
        content: &str,
        relevant_chunks: &[u32],
    ) -> Result<ChatRecord> {
        let conn = self.lock();
        let id = uuid::Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO chat_messages (id, document_id, role, content, relevant_chunks) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                id,
                document_id,
                role,
                content,
                serde_json::to_string(relevant_chunks)?
            ],
        )?;
        Ok(conn.query_row(
            "SELECT id, document_id, role, content, relevant_chunks, created_at FROM chat_messages WHERE id = ?1",
            params![id],
            chat_message_from_row,
        )?)
    }

    pub fn get_chat_history(&self, document_id: &str) -> Result<Vec<ChatRecord>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, document_id, role, content, relevant_chunks, created_at FROM chat_messages \
             WHERE document_id = ?1 ORDER BY created_at ASC, rowid ASC",
        )?;
        let rows = stmt.query_map(params![document_id], chat_message_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn clear_chat_history(&self, document_id: &str) -> Result<usize> {
        let conn = self.lock();
        Ok(conn.execute(
            "DELETE FROM chat_messages WHERE document_id = ?1",
            params![document_id],
        )?)
    }

    // ── Settings ──

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let conn = self.lock();
        Ok(conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?)
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn delete_setting(&self, key: &str) -> Result<()> {
        let conn = self.lock();
        conn.execute("DELETE FROM settings WHERE key = ?1", params![key])?;
        Ok(())
    }
}
