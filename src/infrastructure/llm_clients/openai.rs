use super::{LLMClient, UserContent};
use crate::domain::error::{AppError, Result};
use crate::infrastructure::config::LlmSettings;
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tracing::warn;

/// Chat-completions client for OpenAI-compatible providers. Carries a
/// per-call timeout and a small bounded retry for transient failures, since
/// model calls are the dominant latency and failure source of a request.
pub struct OpenAiClient {
    client: reqwest::Client,
    config: LlmSettings,
}

impl OpenAiClient {
    pub fn new(config: LlmSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn completions_url(&self) -> String {
        if self.config.base_url.ends_with('/') {
            format!("{}chat/completions", self.config.base_url)
        } else {
            format!("{}/chat/completions", self.config.base_url)
        }
    }

    fn request_body(&self, system: &str, user: &UserContent) -> serde_json::Value {
        let user_content = match user {
            UserContent::Text(text) => json!(text),
            UserContent::Image { prompt, payload } => json!([
                {
                    "type": "text",
                    "text": prompt
                },
                {
                    "type": "image_url",
                    "image_url": {
                        "url": format!("data:image/jpeg;base64,{}", payload)
                    }
                }
            ]),
        };

        json!({
            "model": self.config.model,
            "messages": [
                {
                    "role": "system",
                    "content": system
                },
                {
                    "role": "user",
                    "content": user_content
                }
            ],
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
        })
    }

    async fn send_once(
        &self,
        url: &str,
        api_key: &str,
        body: &serde_json::Value,
    ) -> std::result::Result<String, (AppError, bool)> {
        let response = self
            .client
            .post(url)
            .bearer_auth(api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                (
                    AppError::ModelInvocation(format!("Request failed: {}", e)),
                    true,
                )
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let retryable = status.is_server_error();
            let text = response.text().await.unwrap_or_default();
            return Err((
                AppError::ModelInvocation(format!("API error ({}): {}", status, text)),
                retryable,
            ));
        }

        let json: serde_json::Value = response.json().await.map_err(|e| {
            (
                AppError::ModelInvocation(format!("Failed to parse JSON: {}", e)),
                false,
            )
        })?;

        json["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| {
                (
                    AppError::ModelInvocation("Invalid response format".to_string()),
                    false,
                )
            })
    }
}

#[async_trait]
impl LLMClient for OpenAiClient {
    async fn generate(&self, system: &str, user: &UserContent) -> Result<String> {
        let api_key = self
            .config
            .api_key
            .clone()
            .ok_or_else(|| AppError::ModelInvocation("Missing API key".to_string()))?;
        let url = self.completions_url();
        let body = self.request_body(system, user);

        let mut attempt = 0u32;
        loop {
            match self.send_once(&url, &api_key, &body).await {
                Ok(text) => return Ok(text),
                Err((err, retryable)) => {
                    if !retryable || attempt >= self.config.max_retries {
                        return Err(err);
                    }
                    attempt += 1;
                    warn!(attempt, error = %err, "model call failed, retrying");
                    tokio::time::sleep(Duration::from_millis(500 * u64::from(attempt))).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OpenAiClient {
        OpenAiClient::new(LlmSettings::default()).unwrap()
    }

    #[test]
    fn completions_url_handles_trailing_slash() {
        let mut config = LlmSettings::default();
        config.base_url = "http://localhost:1234/v1/".to_string();
        let client = OpenAiClient::new(config).unwrap();
        assert_eq!(
            client.completions_url(),
            "http://localhost:1234/v1/chat/completions"
        );
    }

    #[test]
    fn image_turn_becomes_vision_content_parts() {
        let body = client().request_body(
            "system",
            &UserContent::Image {
                prompt: "look at this".to_string(),
                payload: "QUJD".to_string(),
            },
        );
        let parts = body["messages"][1]["content"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(
            parts[1]["image_url"]["url"].as_str().unwrap(),
            "data:image/jpeg;base64,QUJD"
        );
    }
}
