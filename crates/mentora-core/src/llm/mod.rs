pub mod claude;
pub mod openai;

use crate::db::Database;
use crate::error::{MentoraError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub provider: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: u32,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            model: model.into(),
            temperature: None,
            max_tokens: 4096,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatResponse {
    pub content: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamChunk {
    pub delta: String,
    pub done: bool,
}

/// LLM backend selected from a model string prefix.
#[derive(Debug, Clone)]
pub enum Provider {
    OpenAi(openai::OpenAiConfig),
    Claude(claude::ClaudeConfig),
    Ollama(openai::OpenAiConfig),
}

impl Provider {
    pub fn ollama(host: &str) -> Self {
        Provider::Ollama(openai::OpenAiConfig {
            api_key: String::new(),
            base_url: format!("{}/v1", host.trim_end_matches('/')),
        })
    }

    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, LlmError> {
        match self {
            Provider::OpenAi(config) | Provider::Ollama(config) => {
                openai::chat(config, request).await
            }
            Provider::Claude(config) => claude::chat(config, request).await,
        }
    }

    pub async fn chat_stream(
        &self,
        request: &ChatRequest,
        on_chunk: impl Fn(StreamChunk) + Send,
    ) -> Result<String, LlmError> {
        match self {
            Provider::OpenAi(config) | Provider::Ollama(config) => {
                openai::chat_stream(config, request, on_chunk).await
            }
            Provider::Claude(config) => claude::chat_stream(config, request, on_chunk).await,
        }
    }
}

/// Resolve an LLM provider from a model string like "openai/gpt-4o", "claude/...", "ollama/..."
pub fn resolve_provider(model: &str, db: &Database) -> Result<(Provider, String)> {
    let setting = |key: &str, fallback: &str| -> Result<String> {
        Ok(db
            .get_setting(key)?
            .unwrap_or_else(|| fallback.to_string()))
    };
    let required = |key: &str, name: &str| -> Result<String> {
        db.get_setting(key)?
            .filter(|v| !v.is_empty())
            .ok_or_else(|| MentoraError::InvalidInput(format!("{name} API key not configured")))
    };

    if let Some(model_id) = model.strip_prefix("ollama/") {
        let host = setting("ollama_host", "http://localhost:11434")?;
        Ok((Provider::ollama(&host), model_id.to_string()))
    } else if let Some(model_id) = model.strip_prefix("claude/") {
        Ok((
            Provider::Claude(claude::ClaudeConfig {
                api_key: required("claude_api_key", "Claude")?,
                base_url: setting("claude_base_url", "https://api.anthropic.com")?,
            }),
            model_id.to_string(),
        ))
    } else {
        let model_id = model.strip_prefix("openai/").unwrap_or(model);
        Ok((
            Provider::OpenAi(openai::OpenAiConfig {
                api_key: required("openai_api_key", "OpenAI")?,
                base_url: setting("openai_base_url", "https://api.openai.com/v1")?,
            }),
            model_id.to_string(),
        ))
    }
}

fn model(id: &str, name: &str, provider: &str) -> ModelInfo {
    ModelInfo {
        id: id.into(),
        name: name.into(),
        provider: provider.into(),
    }
}

fn has_key(db: &Database, key: &str) -> Result<bool> {
    Ok(db.get_setting(key)?.is_some_and(|v| !v.is_empty()))
}

/// Models selectable with the currently stored credentials.
pub fn available_models(db: &Database) -> Result<Vec<ModelInfo>> {
    let mut models = Vec::new();

    if has_key(db, "openai_api_key")? {
        models.extend([
            model("openai/gpt-4o", "GPT-4o", "OpenAI"),
            model("openai/gpt-4o-mini", "GPT-4o Mini", "OpenAI"),
            model("openai/gpt-4.1", "GPT-4.1", "OpenAI"),
        ]);
    }

    if has_key(db, "claude_api_key")? {
        models.extend([
            model("claude/claude-sonnet-4-20250514", "Claude Sonnet 4", "Anthropic"),
            model("claude/claude-haiku-3-5-20241022", "Claude Haiku 3.5", "Anthropic"),
        ]);
    }

    // Local models need no key
    models.extend([
        model("ollama/llama3", "Llama 3", "Ollama"),
        model("ollama/qwen2.5", "Qwen 2.5", "Ollama"),
    ]);

    Ok(models)
}

/// Accumulates a server-sent-event byte stream and yields complete `data:` payloads.
/// Bytes are only decoded once a whole line has arrived, so a character split
/// across network reads survives intact.
#[derive(Default)]
pub(crate) struct SseBuffer {
    buffer: Vec<u8>,
}

impl SseBuffer {
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            if let Some(data) = line.trim().strip_prefix("data:") {
                events.push(data.trim_start().to_string());
            }
        }
        events
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
}

impl Serialize for LlmError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sse_buffer_splits_across_pushes() {
        let mut sse = SseBuffer::default();
        assert!(sse.push(b"data: {\"a\":").is_empty());
        let events = sse.push(b"1}\n\nevent: ping\ndata:[DONE]\n");
        assert_eq!(events, vec!["{\"a\":1}", "[DONE]"]);
    }

    #[test]
    fn test_sse_buffer_keeps_split_multibyte_char() {
        let line = "data: {\"t\":\"é\"}\n".as_bytes();
        let split = line.iter().position(|&b| b == 0xC3).unwrap() + 1;
        let mut sse = SseBuffer::default();
        assert!(sse.push(&line[..split]).is_empty());
        assert_eq!(sse.push(&line[split..]), vec!["{\"t\":\"é\"}"]);
    }

    #[test]
    fn test_resolve_provider_requires_key() {
        let db = Database::in_memory().unwrap();
        assert!(resolve_provider("openai/gpt-4o", &db).is_err());

        db.set_setting("openai_api_key", "sk-test").unwrap();
        let (provider, model) = resolve_provider("gpt-4o-mini", &db).unwrap();
        assert_eq!(model, "gpt-4o-mini");
        match provider {
            Provider::OpenAi(config) => assert_eq!(config.base_url, "https://api.openai.com/v1"),
            other => panic!("unexpected provider {other:?}"),
        }
    }

    #[test]
    fn test_resolve_ollama_without_key() {
        let db = Database::in_memory().unwrap();
        db.set_setting("ollama_host", "http://box:11434/").unwrap();
        let (provider, model) = resolve_provider("ollama/llama3", &db).unwrap();
        assert_eq!(model, "llama3");
        match provider {
            Provider::Ollama(config) => assert_eq!(config.base_url, "http://box:11434/v1"),
            other => panic!("unexpected provider {other:?}"),
        }
    }

    #[test]
    fn test_available_models_follow_keys() {
        let db = Database::in_memory().unwrap();
        assert!(available_models(&db)
            .unwrap()
            .iter()
            .all(|m| m.provider == "Ollama"));
        db.set_setting("openai_api_key", "").unwrap();
        assert!(available_models(&db)
            .unwrap()
            .iter()
            .all(|m| m.provider == "Ollama"));
        assert!(resolve_provider("openai/gpt-4o", &db).is_err());

        db.set_setting("claude_api_key", "key").unwrap();
        assert!(available_models(&db)
            .unwrap()
            .iter()
            .any(|m| m.provider == "Anthropic"));
    }
}
