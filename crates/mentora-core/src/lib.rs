//! Core of the Mentora study assistant: document ingestion, keyword
//! retrieval over chunks, LLM-generated study material and quiz grading.

pub mod config;
pub mod db;
pub mod doc_processor;
pub mod error;
pub mod grading;
pub mod ingest;
pub mod llm;
pub mod quiz;
pub mod resolver;
pub mod retriever;
pub mod study;

pub use config::StudyConfig;
pub use db::Database;
pub use error::{MentoraError, Result};
pub use resolver::{resolve_index, AnswerValue, ResolvedIndex};
pub use study::Tutor;
