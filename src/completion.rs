//! Text-generation client for advice
//!
//! Talks to an OpenAI-compatible `/chat/completions` endpoint.
//! Uses a long-lived reqwest::Client for connection pooling.

use crate::error::FinanceError;
use crate::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info};

/// One generation call
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// External text-generation capability
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    /// Text of the first completion, or `None` when the upstream returned none.
    async fn generate(&self, request: &CompletionRequest) -> Result<Option<String>>;
}

/// Reusable chat-completions client (connection-pooled)
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(api_key: String, base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait::async_trait]
impl TextGenerator for OpenAiClient {
    async fn generate(&self, request: &CompletionRequest) -> Result<Option<String>> {
        let url = format!("{}/chat/completions", self.base_url);

        let body = ChatRequest {
            model: &request.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        info!(model = %request.model, "Calling chat completions API");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("Chat completions request failed: {}", e);
                FinanceError::UpstreamFailure(format!("request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(%status, "Chat completions error response: {}", error_text);
            return Err(FinanceError::UpstreamFailure(format!(
                "upstream returned {}",
                status
            )));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            error!("Failed to parse chat completions response: {}", e);
            FinanceError::UpstreamFailure(format!("malformed response: {}", e))
        })?;

        Ok(first_completion(parsed))
    }
}

fn first_completion(response: ChatResponse) -> Option<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Canned generator for development & testing
/// Keeps the advice pipeline functional without an upstream dependency
pub struct StubGenerator {
    reply: StubReply,
    delay: Option<Duration>,
    requests: Mutex<Vec<CompletionRequest>>,
}

enum StubReply {
    Text(Option<String>),
    Fail,
}

impl StubGenerator {
    pub fn replying(text: Option<&str>) -> Self {
        Self::with_reply(StubReply::Text(text.map(str::to_string)))
    }

    pub fn failing() -> Self {
        Self::with_reply(StubReply::Fail)
    }

    /// Sleep before answering, to exercise timeouts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn with_reply(reply: StubReply) -> Self {
        Self {
            reply,
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every request received so far.
    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl TextGenerator for StubGenerator {
    async fn generate(&self, request: &CompletionRequest) -> Result<Option<String>> {
        self.requests.lock().await.push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.reply {
            StubReply::Text(text) => Ok(text.clone()),
            StubReply::Fail => Err(FinanceError::UpstreamFailure(
                "stub generator failure".to_string(),
            )),
        }
    }
}
