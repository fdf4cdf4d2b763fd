//! OpenAI-compatible chat-completions adapter.
//!
//! Returns the first choice's message text untouched; turning it into a
//! content template is the personalization crate's job.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use campaign_core::config::ContentConfig;
use campaign_core::providers::ContentGenerator;
use campaign_core::types::GenerationPrompt;
use campaign_core::{CampaignError, CampaignResult};

use crate::http;

pub struct ChatCompletionGenerator {
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    client: Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
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

impl ChatCompletionGenerator {
    pub fn new(cfg: &ContentConfig) -> CampaignResult<Self> {
        Ok(Self {
            base_url: http::trim_base(&cfg.api_url),
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
            client: http::client(cfg.timeout_ms).map_err(CampaignError::Config)?,
        })
    }

    fn request<'a>(&'a self, prompt: &'a GenerationPrompt) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

/// Extracts `choices[0].message.content`. An empty or missing completion is
/// a generation failure.
pub fn parse_completion(body: &str) -> CampaignResult<String> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| CampaignError::Generation(format!("unexpected completion payload: {e}")))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| CampaignError::Generation("completion contained no text".into()))
}

#[async_trait]
impl ContentGenerator for ChatCompletionGenerator {
    async fn generate(&self, prompt: &GenerationPrompt) -> CampaignResult<String> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(model = %self.model, "POST {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request(prompt))
            .send()
            .await
            .map_err(|e| CampaignError::Generation(format!("completion request: {e}")))?;
        let response = http::ensure_success(response)
            .await
            .map_err(|e| CampaignError::Generation(format!("completion service: {e}")))?;
        let body = response
            .text()
            .await
            .map_err(|e| CampaignError::Generation(format!("completion body: {e}")))?;

        parse_completion(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_carries_both_roles() {
        let generator = ChatCompletionGenerator::new(&ContentConfig::default()).unwrap();
        let prompt = GenerationPrompt {
            system: "You write automotive service campaigns.".into(),
            user: "Rain in Mumbai".into(),
        };
        let body = serde_json::to_value(generator.request(&prompt)).unwrap();
        assert_eq!(body["model"], "gpt-4");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "Rain in Mumbai");
        assert_eq!(body["max_tokens"], 2000);
    }

    #[test]
    fn test_parse_completion() {
        let body = r#"{"choices": [{"index": 0, "message": {"role": "assistant",
                       "content": "{\"title\": \"Monsoon Care\"}"}}]}"#;
        assert_eq!(parse_completion(body).unwrap(), r#"{"title": "Monsoon Care"}"#);
    }

    #[test]
    fn test_empty_completion_is_generation_failure() {
        assert!(matches!(
            parse_completion(r#"{"choices": []}"#),
            Err(CampaignError::Generation(_))
        ));
        assert!(matches!(
            parse_completion(r#"{"choices": [{"message": {"content": "  "}}]}"#),
            Err(CampaignError::Generation(_))
        ));
        assert!(parse_completion("<html>bad gateway</html>").is_err());
    }
}
