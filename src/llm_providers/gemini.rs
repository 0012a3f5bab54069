use super::{GenerationOptions, LLMProvider, LLMProviderConfig, merge_options, post_json};
use crate::providers::{Provider, ProviderError};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

/// Represents the Gemini LLM provider
pub struct GeminiProvider {
    config: LLMProviderConfig,
    client: Client,
}

impl GeminiProvider {
    /// Creates a new instance of `GeminiProvider` with the given configuration
    pub fn new(config: LLMProviderConfig, client: Client) -> Self {
        Self { config, client }
    }
}

#[async_trait]
impl LLMProvider for GeminiProvider {
    /// Generates a message using the Gemini API
    async fn generate_message(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, ProviderError> {
        let model = if self.config.model.is_empty() {
            Provider::Gemini.default_model()
        } else {
            &self.config.model
        };

        let mut request_body = json!({
            "contents": [
                {
                    "role": "user",
                    "parts": [ { "text": prompt } ]
                }
            ],
            "generationConfig": {}
        });
        merge_options(
            &mut request_body["generationConfig"],
            &self.config.additional_params,
            options,
        );

        // Model is part of the URL; the key travels in a header so it never lands in logs
        let api_url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.endpoint, model
        );
        let request = self
            .client
            .post(api_url)
            .header("x-goog-api-key", &self.config.api_key);
        let response_body = post_json(Provider::Gemini, request, &request_body).await?;

        // {"candidates": [{"content": {"parts": [{"text": "..."}]}}]}
        let Some(candidate) = response_body["candidates"].get(0) else {
            let reason = response_body["promptFeedback"]["blockReason"]
                .as_str()
                .unwrap_or("no candidates returned");
            return Err(ProviderError::unavailable(
                Provider::Gemini,
                format!("response contained no candidates ({reason})"),
            ));
        };

        let parts = candidate["content"]["parts"].as_array().ok_or_else(|| {
            ProviderError::unavailable(
                Provider::Gemini,
                "Failed to extract content from Gemini API response",
            )
        })?;

        Ok(parts
            .iter()
            .filter_map(|part| part["text"].as_str())
            .collect::<String>())
    }
}
