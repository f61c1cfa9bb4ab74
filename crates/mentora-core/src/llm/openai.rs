use super::{ChatRequest, ChatResponse, LlmError, SseBuffer, StreamChunk};
use futures::StreamExt;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: &'a [super::ChatMessage],
    stream: bool,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiStreamResponse {
    choices: Vec<OpenAiStreamChoice>,
}

#[derive(Deserialize)]
struct OpenAiStreamChoice {
    delta: OpenAiDelta,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiDelta {
    content: Option<String>,
}

fn build_request(config: &OpenAiConfig, request: &ChatRequest, stream: bool) -> RequestBuilder {
    let body = OpenAiRequest {
        model: &request.model,
        messages: &request.messages,
        stream,
        max_tokens: request.max_tokens,
        temperature: request.temperature,
    };

    let req = Client::new()
        .post(format!("{}/chat/completions", config.base_url))
        .header("Content-Type", "application/json")
        .json(&body);

    // Ollama accepts requests without a key
    if config.api_key.is_empty() {
        req
    } else {
        req.header("Authorization", format!("Bearer {}", config.api_key))
    }
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

/// Interpret one `data:` payload of a completion stream.
/// Returns the text delta and whether the stream has finished.
fn parse_stream_data(data: &str) -> Option<(Option<String>, bool)> {
    if data == "[DONE]" {
        return Some((None, true));
    }
    let parsed: OpenAiStreamResponse = serde_json::from_str(data).ok()?;
    let choice = parsed.choices.into_iter().next()?;
    Some((choice.delta.content, choice.finish_reason.is_some()))
}

pub async fn chat(config: &OpenAiConfig, request: &ChatRequest) -> Result<ChatResponse, LlmError> {
    let resp = send(build_request(config, request, false)).await?;
    let data: OpenAiResponse = resp.json().await?;
    let content = data
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| LlmError::Parse("response contained no choices".into()))?;

    Ok(ChatResponse {
        content,
        model: request.model.clone(),
    })
}

pub async fn chat_stream(
    config: &OpenAiConfig,
    request: &ChatRequest,
    on_chunk: impl Fn(StreamChunk) + Send,
) -> Result<String, LlmError> {
    let resp = send(build_request(config, request, true)).await?;

    let mut full_content = String::new();
    let mut stream = resp.bytes_stream();
    let mut sse = SseBuffer::default();

    while let Some(chunk) = stream.next().await {
        for data in sse.push(&chunk?) {
            let Some((delta, done)) = parse_stream_data(&data) else {
                continue;
            };
            if let Some(content) = delta.filter(|c| !c.is_empty()) {
                full_content.push_str(&content);
                on_chunk(StreamChunk {
                    delta: content,
                    done: false,
                });
            }
            if done {
                on_chunk(StreamChunk {
                    delta: String::new(),
                    done: true,
                });
                return Ok(full_content);
            }
        }
    }

    on_chunk(StreamChunk {
        delta: String::new(),
        done: true,
    });
    Ok(full_content)
}
