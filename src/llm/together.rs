//! Together AI completions client
//!
//! Uses a long-lived reqwest::Client for connection pooling.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

use super::CompletionClient;
use crate::config::AppConfig;
use crate::error::AgentError;

/// Reusable Together client (connection-pooled)
pub struct TogetherClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl TogetherClient {
    pub fn new(api_key: String, base_url: String, model: String) -> crate::Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url,
            model,
            max_tokens: 800,
            temperature: 0.1,
        })
    }

    pub fn from_config(config: &AppConfig) -> crate::Result<Self> {
        let mut client = Self::new(
            config.together_api_key.clone().unwrap_or_default(),
            config.together_base_url.clone(),
            config.together_model.clone(),
        )?;
        client.max_tokens = config.llm_max_tokens;
        client.temperature = config.llm_temperature;
        Ok(client)
    }

    fn build_request<'a>(&'a self, prompt: &'a str) -> CompletionRequest<'a> {
        CompletionRequest {
            model: &self.model,
            prompt,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            stop: vec!["\n\n"],
        }
    }
}

#[async_trait]
impl CompletionClient for TogetherClient {
    async fn complete(&self, prompt: &str) -> crate::Result<String> {
        if self.api_key.is_empty() {
            return Err(AgentError::UpstreamFailure(
                "TOGETHER_API_KEY not configured".to_string(),
            ));
        }

        info!(model = %self.model, "Calling Together completions API");

        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(&self.build_request(prompt))
            .send()
            .await
            .map_err(|e| {
                error!("Together API request failed: {}", e);
                AgentError::UpstreamFailure(format!("Together API error: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!(%status, "Together API error response: {}", error_text);
            return Err(AgentError::UpstreamFailure(format!(
                "Together API returned {}: {}",
                status, error_text
            )));
        }

        let body: CompletionResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Together response: {}", e);
            AgentError::UpstreamFailure(format!("Together parse error: {}", e))
        })?;

        let text = first_choice_text(body)?;
        debug!(raw = %text, "Completion received");

        Ok(text)
    }

    fn model_info(&self) -> String {
        format!("Analysis performed by {} via Together AI", self.model)
    }
}

/// Only the first candidate is consumed.
fn first_choice_text(body: CompletionResponse) -> crate::Result<String> {
    body.choices
        .into_iter()
        .next()
        .and_then(|choice| choice.text)
        .map(|text| text.trim().to_string())
        .ok_or_else(|| {
            AgentError::UpstreamFailure("No completion choices in response".to_string())
        })
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
    stop: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    text: Option<String>,
}
