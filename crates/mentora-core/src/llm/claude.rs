use super::{ChatRequest, ChatResponse, LlmError, SseBuffer, StreamChunk};
use futures::StreamExt;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone)]
pub struct ClaudeConfig {
    pub api_key: String,
    pub base_url: String,
}

#[derive(Serialize)]
struct ClaudeRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ClaudeMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct ClaudeMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ClaudeResponse {
    content: Vec<ClaudeContent>,
}

#[derive(Deserialize)]
struct ClaudeContent {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum ClaudeStreamEvent {
    #[serde(rename = "content_block_delta")]
    ContentBlockDelta { delta: ClaudeDelta },
    #[serde(rename = "message_stop")]
    MessageStop {},
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct ClaudeDelta {
    text: Option<String>,
}

/// Claude takes system prompts as a separate field; several system messages are joined.
fn build_body(request: &ChatRequest, stream: bool) -> ClaudeRequest<'_> {
    let system: Vec<&str> = request
        .messages
        .iter()
        .filter(|m| m.role == "system")
        .map(|m| m.content.as_str())
        .collect();

    ClaudeRequest {
        model: &request.model,
        max_tokens: request.max_tokens,
        messages: request
            .messages
            .iter()
            .filter(|m| m.role != "system")
            .map(|m| ClaudeMessage {
                role: &m.role,
                content: &m.content,
            })
            .collect(),
        stream,
        system: (!system.is_empty()).then(|| system.join("\n\n")),
        temperature: request.temperature,
    }
}

fn build_request(config: &ClaudeConfig, request: &ChatRequest, stream: bool) -> RequestBuilder {
    Client::new()
        .post(format!("{}/v1/messages", config.base_url))
        .header("Content-Type", "application/json")
        .header("x-api-key", &config.api_key)
        .header("anthropic-version", ANTHROPIC_VERSION)
        .json(&build_body(request, stream))
}

async fn send(req: RequestBuilder) -> Result<reqwest::Response, LlmError> {
    let resp = req.send().await?;
    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let text = resp.text().await.unwrap_or_default();
        return Err(LlmError::Api {
            status,
            message: text,
        });
    }
    Ok(resp)
}

pub async fn chat(config: &ClaudeConfig, request: &ChatRequest) -> Result<ChatResponse, LlmError> {
    let resp = send(build_request(config, request, false)).await?;
    let data: ClaudeResponse = resp.json().await?;
    if data.content.is_empty() {
        return Err(LlmError::Parse("response contained no content".into()));
    }
    let content = data
        .content
        .into_iter()
        .map(|c| c.text)
        .collect::<Vec<_>>()
        .concat();

    Ok(ChatResponse {
        content,
        model: request.model.clone(),
    })
}

pub async fn chat_stream(
    config: &ClaudeConfig,
    request: &ChatRequest,
    on_chunk: impl Fn(StreamChunk) + Send,
) -> Result<String, LlmError> {
    let resp = send(build_request(config, request, true)).await?;

    let mut full_content = String::new();
    let mut stream = resp.bytes_stream();
    let mut sse = SseBuffer::default();

    while let Some(chunk) = stream.next().await {
        for data in sse.push(&chunk?) {
            match serde_json::from_str::<ClaudeStreamEvent>(&data) {
                Ok(ClaudeStreamEvent::ContentBlockDelta { delta }) => {
                    if let Some(text) = delta.text {
                        full_content.push_str(&text);
                        on_chunk(StreamChunk {
                            delta: text,
                            done: false,
                        });
                    }
                }
                Ok(ClaudeStreamEvent::MessageStop {}) => {
                    on_chunk(StreamChunk {
                        delta: String::new(),
                        done: true,
                    });
                    return Ok(full_content);
                }
                Ok(ClaudeStreamEvent::Other) | Err(_) => {}
            }
        }
    }

    on_chunk(StreamChunk {
        delta: String::new(),
        done: true,
    });
    Ok(full_content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatMessage;

    #[test]
    fn test_system_messages_move_to_system_field() {
        let request = ChatRequest::new(
            "claude-sonnet-4-20250514",
            vec![
                ChatMessage::system("You are a tutor."),
                ChatMessage::system("Answer briefly."),
                ChatMessage::user("What is ATP?"),
            ],
        );
        let body = serde_json::to_value(build_body(&request, false)).unwrap();
        assert_eq!(body["system"], "You are a tutor.\n\nAnswer briefly.");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[test]
    fn test_no_system_field_without_system_messages() {
        let request = ChatRequest::new("m", vec![ChatMessage::user("hi")]);
        let body = serde_json::to_value(build_body(&request, true)).unwrap();
        assert!(body.get("system").is_none());
        assert_eq!(body["stream"], true);
    }

    #[test]
    fn test_stream_events_decode() {
        let delta: ClaudeStreamEvent = serde_json::from_str(
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hi"}}"#,
        )
        .unwrap();
        assert!(matches!(
            delta,
            ClaudeStreamEvent::ContentBlockDelta { delta: ClaudeDelta { text: Some(ref t) } } if t == "Hi"
        ));
        let ping: ClaudeStreamEvent = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert!(matches!(ping, ClaudeStreamEvent::Other));
    }
}
