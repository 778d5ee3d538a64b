//! OpenAI 兼容 API 客户端
//!
//! 通过 async_openai 调用任意 OpenAI 兼容端点（可配置 base_url）；支持 OpenAI、DeepSeek、LM Studio 等。

use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;

use crate::llm::prompt::SYSTEM_PROMPT;
use crate::llm::{ProviderError, ScriptGenerator};

/// OpenAI 兼容客户端：持有 Client 与 model 名，generate 时拼 system/context/prompt 并取首条 content
pub struct OpenAiGenerator {
    client: Client<OpenAIConfig>,
    model: String,
    request_timeout_secs: u64,
}

impl OpenAiGenerator {
    pub fn new(
        base_url: Option<&str>,
        model: &str,
        api_key: Option<&str>,
        request_timeout_secs: u64,
    ) -> Self {
        let api_key = api_key
            .map(String::from)
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .unwrap_or_else(|| "sk-placeholder".to_string());

        let config = if let Some(url) = base_url {
            OpenAIConfig::new().with_api_base(url).with_api_key(api_key)
        } else {
            OpenAIConfig::new().with_api_key(api_key)
        };

        Self {
            client: Client::with_config(config),
            model: model.to_string(),
            request_timeout_secs,
        }
    }

    fn to_openai_messages(&self, prompt: &str, context: &str) -> Vec<ChatCompletionRequestMessage> {
        let mut messages = vec![ChatCompletionRequestMessage::System(
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_PROMPT.to_string())
                .build()
                .unwrap(),
        )];
        if !context.is_empty() {
            messages.push(ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(format!("Context:\n{}", context))
                    .build()
                    .unwrap(),
            ));
        }
        messages.push(ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt.to_string())
                .build()
                .unwrap(),
        ));
        messages
    }
}

#[async_trait]
impl ScriptGenerator for OpenAiGenerator {
    async fn generate(&self, prompt: &str, context: &str) -> Result<String, ProviderError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(self.to_openai_messages(prompt, context))
            .temperature(0.3)
            .build()
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        let response = tokio::time::timeout(
            std::time::Duration::from_secs(self.request_timeout_secs),
            self.client.chat().create(request),
        )
        .await
        .map_err(|_| ProviderError::Timeout(self.request_timeout_secs))?
        .map_err(|e| ProviderError::Request(e.to_string()))?;

        response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .filter(|c| !c.trim().is_empty())
            .ok_or(ProviderError::EmptyCompletion)
    }
}
