use super::{GenerationOptions, LLMProvider, LLMProviderConfig, merge_options, post_json};
use crate::providers::{Provider, ProviderError};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

/// Represents a local Ollama server
pub struct OllamaProvider {
    config: LLMProviderConfig,
    client: Client,
}

impl OllamaProvider {
    pub fn new(config: LLMProviderConfig, client: Client) -> Self {
        Self { config, client }
    }
}

#[async_trait]
impl LLMProvider for OllamaProvider {
    /// Generates a message through the non-streaming `/api/chat` endpoint
    async fn generate_message(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, ProviderError> {
        let model = if self.config.model.is_empty() {
            Provider::Ollama.default_model()
        } else {
            &self.config.model
        };

        let mut request_body = json!({
            "model": model,
            "messages": [
                { "role": "user", "content": prompt }
            ],
            "stream": false,
            "options": {}
        });
        merge_options(
            &mut request_body["options"],
            &self.config.additional_params,
            options,
        );

        let url = format!("{}/api/chat", self.config.endpoint);
        let request = self.client.post(&url);
        let response_body = post_json(Provider::Ollama, request, &request_body)
            .await
            .map_err(|e| match e {
                ProviderError::Unavailable { provider, detail } => ProviderError::Unavailable {
                    provider,
                    detail: format!("{url}: {detail}"),
                },
                other => other,
            })?;

        // {"message": {"role": "assistant", "content": "..."}, "done": true}
        if let Some(error) = response_body["error"].as_str() {
            return Err(ProviderError::unavailable(Provider::Ollama, error));
        }
        response_body["message"]["content"]
            .as_str()
            .map(ToString::to_string)
            .ok_or_else(|| {
                ProviderError::unavailable(
                    Provider::Ollama,
                    "response did not contain message.content",
                )
            })
    }
}
