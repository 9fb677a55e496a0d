use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use reqwest::{Client, multipart};
use tracing::{error, info};

use crate::error::IntegrationError;
use crate::openai::{ChatMessage, CompletionRequest, chat_completion};

const GROQ_API_BASE: &str = "https://api.groq.com/openai/v1";
const CHAT_MODEL: &str = "llama-3.3-70b-versatile";
const WHISPER_MODEL: &str = "whisper-large-v3";

/// Exchanges (user + assistant) kept per user.
const MAX_HISTORY_PAIRS: usize = 10;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are Kaizen, a helpful AI assistant inside a \
productivity and accountability Telegram bot. You help with daily accountability and habit \
tracking, research, planning and general questions. Be concise, friendly and actionable. Use \
emojis sparingly. Keep answers under 500 words unless more detail is really needed.";

/// Chat completion and speech-to-text against Groq's OpenAI-compatible API.
pub struct GroqClient {
    client: Client,
    base_url: String,
    api_key: String,
    history: Mutex<HashMap<i64, Vec<ChatMessage>>>,
}

impl GroqClient {
    pub fn new(api_key: &str) -> Result<Self, IntegrationError> {
        Self::with_base_url(GROQ_API_BASE, api_key)
    }

    pub fn with_base_url(base_url: &str, api_key: &str) -> Result<Self, IntegrationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| IntegrationError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            history: Mutex::new(HashMap::new()),
        })
    }

    /// Conversational reply that remembers the user's recent exchanges.
    /// History is only extended when the call succeeds.
    pub async fn chat(
        &self,
        user_id: i64,
        message: &str,
        system: Option<&str>,
    ) -> Result<String, IntegrationError> {
        let mut messages = vec![ChatMessage::system(system.unwrap_or(DEFAULT_SYSTEM_PROMPT))];
        messages.extend(self.history_for(user_id));
        messages.push(ChatMessage::user(message));

        let reply = self.complete_messages(&messages, 0.7, 1024).await?;

        if let Ok(mut history) = self.history.lock() {
            let entry = history.entry(user_id).or_default();
            entry.push(ChatMessage::user(message));
            entry.push(ChatMessage::assistant(reply.clone()));
            let excess = entry.len().saturating_sub(MAX_HISTORY_PAIRS * 2);
            entry.drain(..excess);
        }
        Ok(reply)
    }

    /// One-shot completion with no history.
    pub async fn complete(
        &self,
        system: &str,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, IntegrationError> {
        let messages = [ChatMessage::system(system), ChatMessage::user(prompt)];
        self.complete_messages(&messages, temperature, max_tokens).await
    }

    pub fn history_for(&self, user_id: i64) -> Vec<ChatMessage> {
        self.history
            .lock()
            .ok()
            .and_then(|h| h.get(&user_id).cloned())
            .unwrap_or_default()
    }

    pub fn clear_history(&self, user_id: i64) {
        if let Ok(mut history) = self.history.lock() {
            history.remove(&user_id);
        }
    }

    async fn complete_messages(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, IntegrationError> {
        let request = CompletionRequest {
            model: CHAT_MODEL,
            messages,
            temperature,
            max_tokens,
        };
        let resp = chat_completion(&self.client, &self.base_url, &self.api_key, &request).await?;
        resp.first_content()
            .map(str::to_string)
            .ok_or_else(|| IntegrationError::InvalidResponse("no choices in response".into()))
    }

    /// Transcribe a voice note (Telegram sends OGG/Opus).
    pub async fn transcribe(&self, audio: Vec<u8>, file_name: &str) -> Result<String, IntegrationError> {
        let size = audio.len();
        let part = multipart::Part::bytes(audio)
            .file_name(file_name.to_string())
            .mime_str("audio/ogg")
            .map_err(|e| IntegrationError::InvalidInput(e.to_string()))?;
        let form = multipart::Form::new()
            .text("model", WHISPER_MODEL)
            .text("language", "en")
            .text("response_format", "text")
            .part("file", part);

        let url = format!("{}/audio/transcriptions", self.base_url);
        info!(bytes = size, "Transcribing voice message");
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| IntegrationError::network(&e))?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| IntegrationError::network(&e))?;
        if !status.is_success() {
            error!(status = %status, "Transcription API error: {}", text);
            return Err(IntegrationError::from_status(status.as_u16(), &text));
        }

        let transcript = text.trim();
        if transcript.is_empty() {
            return Err(IntegrationError::InvalidResponse("empty transcription".into()));
        }
        Ok(transcript.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn reply(content: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": content } }]
        }))
    }

    #[tokio::test]
    async fn chat_remembers_successful_exchanges() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(reply("Keep going!"))
            .mount(&server)
            .await;

        let groq = GroqClient::with_base_url(&server.uri(), "test-key").unwrap();
        let answer = groq.chat(1, "How do I stay consistent?", None).await.unwrap();
        assert_eq!(answer, "Keep going!");

        let history = groq.history_for(1);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0], ChatMessage::user("How do I stay consistent?"));
        assert!(groq.history_for(2).is_empty());

        groq.clear_history(1);
        assert!(groq.history_for(1).is_empty());
    }

    #[tokio::test]
    async fn history_is_capped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(reply("ok"))
            .mount(&server)
            .await;

        let groq = GroqClient::with_base_url(&server.uri(), "k").unwrap();
        for i in 0..(MAX_HISTORY_PAIRS + 3) {
            groq.chat(1, &format!("msg {}", i), None).await.unwrap();
        }
        let history = groq.history_for(1);
        assert_eq!(history.len(), MAX_HISTORY_PAIRS * 2);
        assert_eq!(history[0].content, "msg 3");
    }

    #[tokio::test]
    async fn failed_chat_leaves_history_alone() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let groq = GroqClient::with_base_url(&server.uri(), "k").unwrap();
        let err = groq.chat(1, "hi", None).await.unwrap_err();
        assert!(matches!(err, IntegrationError::Status { status: 429, .. }));
        assert!(groq.history_for(1).is_empty());
    }

    #[tokio::test]
    async fn transcribe_returns_plain_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/audio/transcriptions"))
            .respond_with(ResponseTemplate::new(200).set_body_string(" remind me to stretch \n"))
            .mount(&server)
            .await;

        let groq = GroqClient::with_base_url(&server.uri(), "k").unwrap();
        let text = groq.transcribe(vec![1, 2, 3], "voice.ogg").await.unwrap();
        assert_eq!(text, "remind me to stretch");
    }
}
