//! 生成客户端抽象
//!
//! 所有后端（OpenAI 兼容 / Ollama / Mock）实现 ScriptGenerator：generate（提示词 + 上下文 -> 脚本文本）。
//! 对编排器而言后端是不透明的；选择哪个实现由配置在构造期决定。

use async_trait::async_trait;
use thiserror::Error;

/// 生成后端错误：对当前轮次是终止性失败（恢复循环只处理脚本层面的失败）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Provider request failed: {0}")]
    Request(String),

    #[error("Provider request timed out after {0}s")]
    Timeout(u64),

    #[error("Provider returned an empty completion")]
    EmptyCompletion,
}

/// 生成客户端 trait：给定提示词与上下文，返回候选脚本文本
///
/// context 为 Context Store 拼好的会话上下文（摘要 + 最近轮次），可为空串。
#[async_trait]
pub trait ScriptGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, context: &str) -> Result<String, ProviderError>;
}
