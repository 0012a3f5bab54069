//! Backend-specific request/response shapes.
//!
//! Each backend turns a prompt into text and reports every failure as
//! [`ProviderError::Unavailable`]; the [`crate::llm`] client picks which one
//! to talk to.

mod gemini;
mod ollama;

pub use gemini::GeminiProvider;
pub use ollama::OllamaProvider;

use crate::providers::{Provider, ProviderError};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::collections::HashMap;

/// Settings a backend needs for one call
#[derive(Debug, Clone, Default)]
pub struct LLMProviderConfig {
    pub model: String,
    pub api_key: String,
    /// Base URL without a trailing slash
    pub endpoint: String,
    pub additional_params: HashMap<String, String>,
}

/// Per-call sampling options
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GenerationOptions {
    pub temperature: Option<f32>,
}

#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Sends a single prompt and returns the reply text
    async fn generate_message(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, ProviderError>;
}

/// Build the backend for `provider` on top of a shared HTTP client
pub fn create_provider(
    provider: Provider,
    config: LLMProviderConfig,
    client: Client,
) -> Box<dyn LLMProvider> {
    match provider {
        Provider::Ollama => Box::new(OllamaProvider::new(config, client)),
        Provider::Gemini => Box::new(GeminiProvider::new(config, client)),
    }
}

/// Numbers stay numbers so backends accept `top_p = "0.9"` style params
fn param_value(value: &str) -> Value {
    if let Ok(int_val) = value.parse::<i64>() {
        json!(int_val)
    } else if let Ok(num_val) = value.parse::<f64>() {
        json!(num_val)
    } else if let Ok(bool_val) = value.parse::<bool>() {
        json!(bool_val)
    } else {
        json!(value)
    }
}

/// Merge configured params and the call's options into a JSON object
fn merge_options(
    target: &mut Value,
    additional_params: &HashMap<String, String>,
    options: &GenerationOptions,
) {
    for (key, value) in additional_params {
        target[key] = param_value(value);
    }
    if let Some(temperature) = options.temperature {
        target["temperature"] = json!(temperature);
    }
}

/// Send a JSON body and decode a JSON reply, mapping every failure to `Unavailable`
async fn post_json(
    provider: Provider,
    request: reqwest::RequestBuilder,
    body: &Value,
) -> Result<Value, ProviderError> {
    let response = request.json(body).send().await.map_err(|e| {
        let detail = if e.is_timeout() {
            format!("request timed out: {e}")
        } else if e.is_connect() {
            format!("connection failed: {e}")
        } else {
            e.to_string()
        };
        ProviderError::unavailable(provider, detail)
    })?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(ProviderError::unavailable(
            provider,
            format!("API request failed with status {status}: {}", text.trim()),
        ));
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| ProviderError::unavailable(provider, format!("malformed response: {e}")))
}
