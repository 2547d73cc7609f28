//! Language-model wager suggestions
//!
//! Talks to any OpenAI-compatible `/v1/chat/completions` endpoint.

use crate::config::LlmConfig;
use crate::error::{BotError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// One completion request: a system context plus the user's message
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestionRequest {
    pub system: String,
    pub user: String,
    /// Overrides the configured token cap
    pub max_tokens: Option<u32>,
    /// Ask the provider for a JSON object response
    pub json: bool,
}

/// Source of free-text or JSON-ish wager suggestions
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SuggestionSource: Send + Sync {
    async fn suggest(&self, request: &SuggestionRequest) -> Result<String>;
}

pub struct LlmClient {
    http: Client,
    provider: String,
    base_url: String,
    model: String,
    api_key: String,
    temperature: f64,
    max_tokens: u32,
}

impl LlmClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let provider = config.provider.to_lowercase();
        let (base_url, model) = match provider.as_str() {
            "deepseek" => (
                config.base_url.clone().unwrap_or_else(|| "https://api.deepseek.com".to_string()),
                config.model.clone().unwrap_or_else(|| "deepseek-chat".to_string()),
            ),
            "ollama" => (
                config.base_url.clone().unwrap_or_else(|| "http://localhost:11434".to_string()),
                config.model.clone().unwrap_or_else(|| "qwen2.5:14b".to_string()),
            ),
            _ => (
                config.base_url.clone().unwrap_or_else(|| "https://api.openai.com".to_string()),
                config.model.clone().unwrap_or_else(|| "gpt-4o-mini".to_string()),
            ),
        };

        if config.api_key.is_empty() && provider != "ollama" {
            return Err(BotError::NotConfigured("llm.api_key"));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            provider,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key: config.api_key.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Provider name for logging
    pub fn name(&self) -> &str {
        &self.provider
    }

    pub(crate) fn endpoint(&self) -> String {
        // base URLs may already carry the /v1 segment
        if self.base_url.ends_with("/v1") {
            format!("{}/chat/completions", self.base_url)
        } else {
            format!("{}/v1/chat/completions", self.base_url)
        }
    }

    pub(crate) fn build_body(&self, request: &SuggestionRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "temperature": self.temperature,
            "max_tokens": request.max_tokens.unwrap_or(self.max_tokens),
            "messages": [
                {"role": "system", "content": request.system},
                {"role": "user", "content": request.user},
            ],
        });
        if request.json {
            body["response_format"] = serde_json::json!({"type": "json_object"});
        }
        body
    }
}

#[async_trait]
impl SuggestionSource for LlmClient {
    async fn suggest(&self, request: &SuggestionRequest) -> Result<String> {
        let mut req = self
            .http
            .post(self.endpoint())
            .header("content-type", "application/json");

        if !self.api_key.is_empty() {
            req = req.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let resp = req.json(&self.build_body(request)).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BotError::Api(format!(
                "{} returned {}: {}",
                self.provider,
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let resp: serde_json::Value = resp.json().await?;
        let content = resp["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.trim().to_string())
            .unwrap_or_default();

        if content.is_empty() {
            return Err(BotError::Api("Empty LLM response".into()));
        }

        tracing::debug!("{} suggestion: {} chars", self.provider, content.len());
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: &str) -> LlmConfig {
        LlmConfig {
            provider: provider.to_string(),
            api_key: "sk-test".to_string(),
            model: None,
            base_url: None,
            temperature: 0.7,
            max_tokens: 200,
            parlay_max_tokens: 400,
            timeout_secs: 30,
        }
    }

    #[test]
    fn test_openai_defaults() {
        let client = LlmClient::from_config(&config("openai")).unwrap();
        assert_eq!(client.model(), "gpt-4o-mini");
        assert_eq!(client.endpoint(), "https://api.openai.com/v1/chat/completions");
        assert_eq!(client.name(), "openai");
    }

    #[test]
    fn test_deepseek_defaults() {
        let client = LlmClient::from_config(&config("DeepSeek")).unwrap();
        assert_eq!(client.model(), "deepseek-chat");
        assert_eq!(client.endpoint(), "https://api.deepseek.com/v1/chat/completions");
    }

    #[test]
    fn test_base_url_with_version_segment() {
        let mut cfg = config("openai");
        cfg.base_url = Some("https://example.com/v1/".to_string());
        let client = LlmClient::from_config(&cfg).unwrap();
        assert_eq!(client.endpoint(), "https://example.com/v1/chat/completions");
    }

    #[test]
    fn test_missing_key_rejected() {
        let mut cfg = config("openai");
        cfg.api_key = String::new();
        assert!(matches!(
            LlmClient::from_config(&cfg),
            Err(BotError::NotConfigured("llm.api_key"))
        ));
    }

    #[test]
    fn test_ollama_needs_no_key() {
        let mut cfg = config("ollama");
        cfg.api_key = String::new();
        assert!(LlmClient::from_config(&cfg).is_ok());
    }

    #[test]
    fn test_request_body() {
        let client = LlmClient::from_config(&config("openai")).unwrap();
        let body = client.build_body(&SuggestionRequest {
            system: "sys".to_string(),
            user: "pick".to_string(),
            max_tokens: Some(400),
            json: true,
        });
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["max_tokens"], 400);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "pick");
        assert_eq!(body["response_format"]["type"], "json_object");

        let plain = client.build_body(&SuggestionRequest {
            system: "sys".to_string(),
            user: "pick".to_string(),
            max_tokens: None,
            json: false,
        });
        assert_eq!(plain["max_tokens"], 200);
        assert!(plain.get("response_format").is_none());
    }
}
