//! LLM 层：生成客户端抽象与实现（OpenAI 兼容 / Ollama / Mock）

pub mod mock;
pub mod ollama;
pub mod openai;
pub mod prompt;
pub mod traits;

use std::sync::Arc;

pub use mock::MockGenerator;
pub use ollama::OllamaGenerator;
pub use openai::OpenAiGenerator;
pub use traits::{ProviderError, ScriptGenerator};

use crate::config::LlmSection;

/// 根据配置选择生成后端（OpenAI 兼容 / Ollama / Mock）
///
/// provider 未知时回落到 Mock 并告警，保证离线也能跑通流水线。
pub fn create_generator_from_config(cfg: &LlmSection) -> Arc<dyn ScriptGenerator> {
    match cfg.provider.to_lowercase().as_str() {
        "openai" => {
            tracing::info!("Using OpenAI-compatible generator ({})", cfg.model);
            Arc::new(OpenAiGenerator::new(
                cfg.base_url.as_deref(),
                &cfg.model,
                std::env::var("OPENAI_API_KEY").ok().as_deref(),
                cfg.request_timeout_secs,
            ))
        }
        "ollama" => {
            tracing::info!("Using Ollama generator ({})", cfg.model);
            Arc::new(OllamaGenerator::new(
                cfg.base_url.as_deref(),
                &cfg.model,
                cfg.request_timeout_secs,
            ))
        }
        "mock" => Arc::new(MockGenerator::new()),
        other => {
            tracing::warn!("Unknown LLM provider '{}', using Mock generator", other);
            Arc::new(MockGenerator::new())
        }
    }
}
