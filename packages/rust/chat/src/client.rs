//! HTTP client for OpenAI-compatible chat-completions endpoints (OpenRouter by default).

use std::time::Instant;

use reqwest::Client;
use tracing::{debug, instrument};

use rankpages_shared::{ChatConfig, RankPagesError, Result};

use crate::{ChatRequest, ChatService};

/// User-Agent string for chat requests.
const USER_AGENT: &str = concat!("rankpages/", env!("CARGO_PKG_VERSION"));

/// Longest slice of an error body quoted in error messages.
const MAX_ERROR_BODY_CHARS: usize = 200;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, serde::Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, serde::Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, serde::Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, serde::Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, serde::Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

// ---------------------------------------------------------------------------
// ChatClient
// ---------------------------------------------------------------------------

/// Chat-completions client authenticated with a bearer token.
pub struct ChatClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl ChatClient {
    /// Create a client for `endpoint`.
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| RankPagesError::config(format!("failed to build chat client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }

    /// Create a client from the `[chat]` config section and a resolved key.
    pub fn from_config(config: &ChatConfig, api_key: impl Into<String>) -> Result<Self> {
        Self::new(config.endpoint.clone(), api_key)
    }
}

impl ChatService for ChatClient {
    #[instrument(skip_all, fields(model = %request.model))]
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let body = CompletionRequest {
            model: &request.model,
            messages: vec![Message {
                role: "user",
                content: &request.prompt,
            }],
        };

        let start = Instant::now();
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .timeout(request.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| RankPagesError::Service(format!("request failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RankPagesError::Service(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(RankPagesError::Service(format!(
                "HTTP {status}: {}",
                snippet(&text)
            )));
        }

        let parsed: CompletionResponse = serde_json::from_str(&text).map_err(|e| {
            RankPagesError::Service(format!("invalid response: {e} (got: {})", snippet(&text)))
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| RankPagesError::Service("response contained no content".into()))?;

        debug!(
            latency_ms = start.elapsed().as_millis() as u64,
            chars = content.len(),
            "chat completion received"
        );
        Ok(content)
    }
}

fn snippet(text: &str) -> String {
    text.chars().take(MAX_ERROR_BODY_CHARS).collect()
}
