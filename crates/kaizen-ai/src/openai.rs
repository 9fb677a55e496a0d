//! Wire types shared by the OpenAI-compatible chat endpoints (Groq and
//! Perplexity both speak this format).

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::IntegrationError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
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

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
    /// Perplexity only.
    #[serde(default)]
    pub citations: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl CompletionResponse {
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .filter(|s| !s.trim().is_empty())
    }
}

/// POST `{base_url}/chat/completions` and decode the response.
pub(crate) async fn chat_completion(
    client: &Client,
    base_url: &str,
    api_key: &str,
    request: &CompletionRequest<'_>,
) -> Result<CompletionResponse, IntegrationError> {
    let url = format!("{}/chat/completions", base_url);
    debug!(model = request.model, url = %url, "Calling chat completion");

    let resp = client
        .post(&url)
        .bearer_auth(api_key)
        .json(request)
        .send()
        .await
        .map_err(|e| {
            error!("HTTP request failed: {}", e);
            IntegrationError::network(&e)
        })?;

    let status = resp.status();
    let text = resp.text().await.map_err(|e| IntegrationError::network(&e))?;
    if !status.is_success() {
        error!(status = %status, "Completion API error: {}", text);
        return Err(IntegrationError::from_status(status.as_u16(), &text));
    }

    serde_json::from_str(&text).map_err(|e| IntegrationError::InvalidResponse(e.to_string()))
}
