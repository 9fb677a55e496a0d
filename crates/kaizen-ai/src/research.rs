use std::time::Duration;

use kaizen_types::callbacks::ResearchDepth;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::IntegrationError;
use crate::openai::{ChatMessage, CompletionRequest, chat_completion};

const PERPLEXITY_API_BASE: &str = "https://api.perplexity.ai";
const RESEARCH_MODEL: &str = "llama-3.1-sonar-small-128k-online";

/// A sourced answer from the research provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Research {
    pub answer: String,
    pub citations: Vec<String>,
}

impl Research {
    /// Markdown body with a numbered source list, used for chat replies and
    /// saved notes alike.
    pub fn to_markdown(&self, topic: &str) -> String {
        let mut out = format!("# {}\n\n{}\n", topic, self.answer.trim());
        if !self.citations.is_empty() {
            out.push_str("\n## Sources\n\n");
            for (i, url) in self.citations.iter().enumerate() {
                out.push_str(&format!("{}. {}\n", i + 1, url));
            }
        }
        out
    }
}

pub struct PerplexityClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl PerplexityClient {
    pub fn new(api_key: &str) -> Result<Self, IntegrationError> {
        Self::with_base_url(PERPLEXITY_API_BASE, api_key)
    }

    pub fn with_base_url(base_url: &str, api_key: &str) -> Result<Self, IntegrationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| IntegrationError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub async fn research(&self, query: &str, depth: ResearchDepth) -> Result<Research, IntegrationError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(IntegrationError::InvalidInput(
                "Tell me what to research, e.g. /dr benefits of cold showers".into(),
            ));
        }

        let (system, max_tokens) = match depth {
            ResearchDepth::Quick => (
                "You are a research assistant. Provide accurate, well-sourced information. \
                 Be concise: a short summary and the key facts.",
                1024,
            ),
            ResearchDepth::Deep => (
                "You are a research assistant. Provide accurate, well-sourced information. \
                 Be comprehensive: structure the answer in sections, include key facts, \
                 statistics and differing viewpoints where relevant.",
                2048,
            ),
        };
        let messages = [ChatMessage::system(system), ChatMessage::user(query)];
        let request = CompletionRequest {
            model: RESEARCH_MODEL,
            messages: &messages,
            temperature: 0.2,
            max_tokens,
        };

        info!(depth = depth.label(), "Starting research");
        let resp = chat_completion(&self.client, &self.base_url, &self.api_key, &request).await?;
        let answer = resp.first_content().unwrap_or("No answer found.").to_string();
        Ok(Research {
            answer,
            citations: resp.citations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn research_collects_citations() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({ "model": RESEARCH_MODEL, "max_tokens": 2048 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "content": "Sleep matters." } }],
                "citations": ["https://a.example", "https://b.example"]
            })))
            .mount(&server)
            .await;

        let client = PerplexityClient::with_base_url(&server.uri(), "k").unwrap();
        let research = client.research("sleep", ResearchDepth::Deep).await.unwrap();
        assert_eq!(research.answer, "Sleep matters.");
        assert_eq!(research.citations.len(), 2);

        let md = research.to_markdown("sleep");
        assert!(md.starts_with("# sleep\n\nSleep matters.\n"));
        assert!(md.contains("2. https://b.example"));
    }

    #[tokio::test]
    async fn empty_query_is_rejected_locally() {
        let client = PerplexityClient::with_base_url("http://127.0.0.1:9", "k").unwrap();
        let err = client.research("  ", ResearchDepth::Quick).await.unwrap_err();
        assert!(matches!(err, IntegrationError::InvalidInput(_)));
    }
}
