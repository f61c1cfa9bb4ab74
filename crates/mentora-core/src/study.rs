//! LLM-backed study tools: flashcards, quizzes, summaries, concept
//! explanations and chat grounded in a document's chunks.

use crate::config::StudyConfig;
use crate::db::models::{default_difficulty, FlashcardDraft, FlashcardSet, Quiz, QuizQuestion};
use crate::db::Database;
use crate::error::{MentoraError, Result};
use crate::llm::{self, ChatMessage, ChatRequest, Provider, StreamChunk};
use crate::resolver::{resolve_index, AnswerValue};
use crate::retriever::{build_context, find_relevant_chunks, ScoredChunk};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Characters of document text sent with whole-document prompts.
const MAX_DOCUMENT_CHARS: usize = 20_000;

const TUTOR_SYSTEM_PROMPT: &str = "You are a patient study assistant. \
Ground every answer in the provided document material and say so when the material does not cover the question.";

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub document_id: String,
    pub title: String,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Explanation {
    pub concept: String,
    pub explanation: String,
    pub relevant_chunks: Vec<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatAnswer {
    pub question: String,
    pub answer: String,
    pub relevant_chunks: Vec<u32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuestionDraft {
    question: String,
    #[serde(default)]
    options: Vec<String>,
    #[serde(alias = "correct_answer", alias = "answer")]
    correct_answer: AnswerValue,
    #[serde(default)]
    explanation: String,
    #[serde(default = "default_difficulty")]
    difficulty: String,
}

/// Longest prefix of `text` with at most `max` characters.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// JSON payload of a model reply, with Markdown code fences or chatter around it removed.
pub fn extract_json(reply: &str) -> &str {
    let trimmed = reply.trim();
    if let Some(start) = trimmed.find("```") {
        let body = &trimmed[start + 3..];
        let body = body.strip_prefix("json").unwrap_or(body);
        if let Some(end) = body.find("```") {
            return body[..end].trim();
        }
    }
    let open = trimmed.find(['[', '{']);
    let close = trimmed.rfind([']', '}']);
    match (open, close) {
        (Some(open), Some(close)) if open < close => &trimmed[open..=close],
        _ => trimmed,
    }
}

pub fn parse_flashcards(reply: &str) -> Result<Vec<FlashcardDraft>> {
    let cards: Vec<FlashcardDraft> = serde_json::from_str(extract_json(reply))?;
    Ok(cards
        .into_iter()
        .filter(|c| !c.question.trim().is_empty() && !c.answer.trim().is_empty())
        .collect())
}

/// Parse generated questions and fix each one's correct option index.
/// Questions with fewer than two options are dropped.
pub fn parse_quiz(reply: &str) -> Result<Vec<QuizQuestion>> {
    let drafts: Vec<QuestionDraft> = serde_json::from_str(extract_json(reply))?;
    Ok(drafts
        .into_iter()
        .filter(|d| d.options.len() >= 2)
        .map(|d| {
            let correct_index = resolve_index(&d.correct_answer, &d.options);
            if correct_index.is_none() {
                warn!(question = %d.question, "generated answer matches no option");
            }
            QuizQuestion {
                question: d.question,
                correct_index: correct_index.into(),
                correct_answer: d.correct_answer,
                options: d.options,
                explanation: d.explanation,
                difficulty: d.difficulty,
            }
        })
        .collect())
}

pub fn flashcards_prompt(text: &str, count: usize) -> String {
    format!(
        "Generate exactly {count} educational flashcards from the text below.\n\
         Reply with only a JSON array of objects with the keys \"question\", \"answer\" \
         and \"difficulty\" (one of \"easy\", \"medium\", \"hard\").\n\
         Keep questions specific and answers concise.\n\n\
         Text:\n{}",
        truncate_chars(text, MAX_DOCUMENT_CHARS)
    )
}

pub fn quiz_prompt(text: &str, num_questions: usize) -> String {
    format!(
        "Generate exactly {num_questions} multiple choice questions from the text below.\n\
         Reply with only a JSON array of objects with the keys \"question\", \"options\" \
         (an array of 4 strings), \"correctAnswer\" (the zero-based index of the correct option), \
         \"explanation\" and \"difficulty\" (one of \"easy\", \"medium\", \"hard\").\n\n\
         Text:\n{}",
        truncate_chars(text, MAX_DOCUMENT_CHARS)
    )
}

pub fn summary_prompt(text: &str) -> String {
    format!(
        "Summarize the text below for a student revising it. Highlight the key concepts, \
         main ideas and important points in clear, well-structured prose.\n\n\
         Text:\n{}",
        truncate_chars(text, MAX_DOCUMENT_CHARS)
    )
}

pub fn explain_prompt(concept: &str, context: &str) -> String {
    format!(
        "Explain the concept \"{concept}\" using the context below. Give a clear, \
         educational explanation with examples where they help.\n\n\
         Context:\n{context}"
    )
}

pub fn chat_prompt(question: &str, chunks: &[ScoredChunk]) -> String {
    let context = chunks
        .iter()
        .map(|c| format!("[Chunk {}]\n{}", c.chunk_index, c.content))
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("Context from the document:\n{context}\n\nQuestion: {question}")
}

/// Generation parameters plus the model that serves them.
pub struct Tutor {
    pub config: StudyConfig,
    pub provider: Provider,
    pub model: String,
}

impl Tutor {
    /// Build from stored settings. `model` overrides the configured default.
    pub fn from_settings(db: &Database, model: Option<&str>) -> Result<Self> {
        let config = StudyConfig::load(db)?;
        let model = model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(&config.default_model)
            .to_string();
        let (provider, model) = llm::resolve_provider(&model, db)?;
        Ok(Self {
            config,
            provider,
            model,
        })
    }

    fn request(&self, prompt: String) -> ChatRequest {
        ChatRequest::new(
            self.model.clone(),
            vec![ChatMessage::system(TUTOR_SYSTEM_PROMPT), ChatMessage::user(prompt)],
        )
    }

    async fn complete(&self, prompt: String) -> Result<String> {
        let response = self.provider.chat(&self.request(prompt)).await?;
        Ok(response.content)
    }

    fn relevant_chunks(&self, db: &Database, document_id: &str, query: &str) -> Result<Vec<ScoredChunk>> {
        let chunks = db.get_chunks(document_id)?;
        let relevant = find_relevant_chunks(&chunks, query, self.config.context_chunks);
        debug!(
            document_id,
            chunks = ?relevant.iter().map(|c| c.chunk_index).collect::<Vec<_>>(),
            "retrieved context"
        );
        Ok(relevant)
    }

    pub async fn generate_flashcards(
        &self,
        db: &Database,
        document_id: &str,
        count: Option<usize>,
    ) -> Result<FlashcardSet> {
        let (document, text) = db.get_ready_document(document_id)?;
        let count = count.unwrap_or(self.config.flashcard_count).max(1);

        let reply = self.complete(flashcards_prompt(&text, count)).await?;
        let cards = parse_flashcards(&reply)?;
        if cards.is_empty() {
            return Err(MentoraError::InvalidInput(
                "The model returned no usable flashcards".into(),
            ));
        }

        let set = db.create_flashcard_set(&document.id, &cards)?;
        info!(document_id, cards = set.cards.len(), "generated flashcards");
        Ok(set)
    }

    pub async fn generate_quiz(
        &self,
        db: &Database,
        document_id: &str,
        num_questions: Option<usize>,
        title: Option<&str>,
    ) -> Result<Quiz> {
        let (document, text) = db.get_ready_document(document_id)?;
        let num_questions = num_questions.unwrap_or(self.config.quiz_questions).max(1);

        let reply = self.complete(quiz_prompt(&text, num_questions)).await?;
        let questions = parse_quiz(&reply)?;
        if questions.is_empty() {
            return Err(MentoraError::InvalidInput(
                "The model returned no usable questions".into(),
            ));
        }

        let title = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .unwrap_or_else(|| format!("{} - Quiz", document.title));
        let quiz = db.create_quiz(&document.id, &title, &questions)?;
        info!(document_id, questions = quiz.total_questions, "generated quiz");
        Ok(quiz)
    }

    pub async fn generate_summary(&self, db: &Database, document_id: &str) -> Result<Summary> {
        let (document, text) = db.get_ready_document(document_id)?;
        let summary = self.complete(summary_prompt(&text)).await?;
        info!(document_id, "generated summary");
        Ok(Summary {
            document_id: document.id,
            title: document.title,
            summary,
        })
    }

    pub async fn explain_concept(
        &self,
        db: &Database,
        document_id: &str,
        concept: &str,
    ) -> Result<Explanation> {
        let concept = concept.trim();
        if concept.is_empty() {
            return Err(MentoraError::InvalidInput("Please provide a concept".into()));
        }
        db.get_ready_document(document_id)?;

        let relevant = self.relevant_chunks(db, document_id, concept)?;
        let explanation = self
            .complete(explain_prompt(concept, &build_context(&relevant)))
            .await?;
        Ok(Explanation {
            concept: concept.to_string(),
            explanation,
            relevant_chunks: relevant.iter().map(|c| c.chunk_index).collect(),
        })
    }

    /// Answer a question about a document, streaming the reply through `on_chunk`.
    /// Both sides of the exchange are stored in the document's chat history.
    pub async fn chat(
        &self,
        db: &Database,
        document_id: &str,
        question: &str,
        on_chunk: impl Fn(StreamChunk) + Send,
    ) -> Result<ChatAnswer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(MentoraError::InvalidInput("Please provide a question".into()));
        }
        db.get_ready_document(document_id)?;

        let relevant = self.relevant_chunks(db, document_id, question)?;
        let chunk_indices: Vec<u32> = relevant.iter().map(|c| c.chunk_index).collect();

        let request = self.request(chat_prompt(question, &relevant));
        let answer = self.provider.chat_stream(&request, on_chunk).await?;

        db.add_chat_message(document_id, "user", question, &[])?;
        db.add_chat_message(document_id, "assistant", &answer, &chunk_indices)?;
        info!(document_id, chunks = ?chunk_indices, "answered chat question");

        Ok(ChatAnswer {
            question: question.to_string(),
            answer,
            relevant_chunks: chunk_indices,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ResolvedIndex;

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn test_extract_json_from_fences_and_chatter() {
        assert_eq!(extract_json("```json\n[1, 2]\n```"), "[1, 2]");
        assert_eq!(extract_json("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(extract_json("Sure! Here you go: [1] Enjoy."), "[1]");
        assert_eq!(extract_json("[]"), "[]");
    }

    #[test]
    fn test_parse_flashcards() {
        let reply = r#"```json
[
  {"question": "What is ATP?", "answer": "Energy currency", "difficulty": "easy"},
  {"question": "Where is DNA?", "answer": "Nucleus"},
  {"question": " ", "answer": "dropped"}
]
```"#;
        let cards = parse_flashcards(reply).unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].difficulty, "easy");
        assert_eq!(cards[1].difficulty, "medium");
    }

    #[test]
    fn test_parse_quiz_resolves_correct_index() {
        let reply = r#"[
  {"question": "Capital of Italy?", "options": ["Paris", "London", "Rome"], "correctAnswer": "Rome", "explanation": "Rome is the capital."},
  {"question": "Capital of France?", "options": ["Paris", "London", "Rome"], "correctAnswer": 0},
  {"question": "Capital of UK?", "options": ["Paris", "London", "Rome"], "correct_answer": "O2"},
  {"question": "Only one option", "options": ["Yes"], "correctAnswer": 0}
]"#;
        let questions = parse_quiz(reply).unwrap();
        assert_eq!(questions.len(), 3);
        assert_eq!(questions[0].correct_index, ResolvedIndex(Some(2)));
        assert_eq!(questions[1].correct_index, ResolvedIndex(Some(0)));
        assert_eq!(questions[2].correct_index, ResolvedIndex(Some(1)));
        assert_eq!(questions[1].difficulty, "medium");
    }

    #[test]
    fn test_parse_quiz_rejects_non_json() {
        assert!(matches!(
            parse_quiz("I cannot do that."),
            Err(MentoraError::Json(_))
        ));
    }

    #[test]
    fn test_prompts_carry_inputs() {
        assert!(flashcards_prompt("mitosis", 5).contains("exactly 5"));
        assert!(quiz_prompt("mitosis", 3).ends_with("mitosis"));
        let long = "x".repeat(MAX_DOCUMENT_CHARS + 100);
        let prompt = summary_prompt(&long);
        assert!(prompt.contains(&"x".repeat(MAX_DOCUMENT_CHARS)));
        assert!(!prompt.contains(&"x".repeat(MAX_DOCUMENT_CHARS + 1)));
        assert!(explain_prompt("osmosis", "water moves").contains("\"osmosis\""));
    }

    #[test]
    fn test_chat_prompt_labels_chunks() {
        let chunks = vec![ScoredChunk {
            chunk_index: 4,
            page_number: 2,
            content: "ATP stores energy".into(),
            score: 1,
        }];
        let prompt = chat_prompt("What stores energy?", &chunks);
        assert!(prompt.contains("[Chunk 4]\nATP stores energy"));
        assert!(prompt.ends_with("Question: What stores energy?"));
    }

    #[test]
    fn test_tutor_from_settings_uses_default_model() {
        let db = Database::in_memory().unwrap();
        db.set_setting("default_model", "ollama/llama3").unwrap();
        let tutor = Tutor::from_settings(&db, None).unwrap();
        assert_eq!(tutor.model, "llama3");
        let tutor = Tutor::from_settings(&db, Some("ollama/qwen2.5")).unwrap();
        assert_eq!(tutor.model, "qwen2.5");
        assert!(Tutor::from_settings(&db, Some("openai/gpt-4o")).is_err());
    }
}
