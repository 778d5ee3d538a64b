//! Ollama 本地模型客户端
//!
//! 调用本地 Ollama 服务的 /api/generate 端点（非流式），无需 API Key。

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::llm::prompt::SYSTEM_PROMPT;
use crate::llm::{ProviderError, ScriptGenerator};

pub const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434";

/// Ollama 客户端：POST /api/generate 取 response 字段
pub struct OllamaGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
    request_timeout_secs: u64,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

impl OllamaGenerator {
    pub fn new(base_url: Option<&str>, model: &str, request_timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(request_timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.unwrap_or(OLLAMA_DEFAULT_URL).trim_end_matches('/').to_string(),
            model: model.to_string(),
            request_timeout_secs,
        }
    }
}

#[async_trait]
impl ScriptGenerator for OllamaGenerator {
    async fn generate(&self, prompt: &str, context: &str) -> Result<String, ProviderError> {
        let full_prompt = if context.is_empty() {
            prompt.to_string()
        } else {
            format!("Context:\n{}\n\n{}", context, prompt)
        };

        let url = format!("{}/api/generate", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&json!({
                "model": self.model,
                "system": SYSTEM_PROMPT,
                "prompt": full_prompt,
                "stream": false,
            }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(self.request_timeout_secs)
                } else {
                    ProviderError::Request(e.to_string())
                }
            })?
            .error_for_status()
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        if body.response.trim().is_empty() {
            return Err(ProviderError::EmptyCompletion);
        }
        Ok(body.response)
    }
}
