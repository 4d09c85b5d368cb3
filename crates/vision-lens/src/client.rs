//! Chat-completion client for the vision model provider.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{ImageArtifact, VisionError, VisionResult};

/// Question sent when the caller does not supply one.
pub const DEFAULT_QUESTION: &str = "What's in this image? Describe it in detail.";

/// Default OpenAI-compatible API root.
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Upper bound on answer length requested from the provider.
const MAX_ANSWER_TOKENS: u32 = 1024;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// HTTP client for single-shot image questions.
///
/// Holds only the connection pool and endpoint; the credential and model are
/// supplied per call so nothing mutable is shared between concurrent calls.
#[derive(Debug, Clone)]
pub struct VisionClient {
    http: reqwest::Client,
    endpoint: String,
}

impl VisionClient {
    pub fn new(api_base: &str, timeout: Duration) -> VisionResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("vision-lens/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", api_base.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Ask `question` (or [`DEFAULT_QUESTION`]) about `image` and return the answer text.
    ///
    /// The body is read in full before parsing so that a failed status can be
    /// reported together with whatever the provider said.
    pub async fn ask(
        &self,
        api_key: &str,
        model: &str,
        question: Option<&str>,
        image: &ImageArtifact,
    ) -> VisionResult<String> {
        let question = question
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .unwrap_or(DEFAULT_QUESTION);

        let body = ChatRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ContentPart::Text { text: question },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: image.data_uri(),
                        },
                    },
                ],
            }],
            max_tokens: MAX_ANSWER_TOKENS,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            tracing::warn!("Vision API responded with {status}");
            return Err(VisionError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
                body: text,
            });
        }

        extract_answer(&text)
    }
}

/// Pull the first choice's message text out of a chat-completion body.
fn extract_answer(body: &str) -> VisionResult<String> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| VisionError::InvalidResponse(format!("{e}: {body}")))?;

    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| VisionError::InvalidResponse("response contained no choices".to_string()))?;

    match choice.message.content {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(VisionError::InvalidResponse(
            "first choice has no message content".to_string(),
        )),
    }
}
