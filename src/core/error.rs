//! 流水线错误类型
//!
//! 校验拒绝与执行失败由恢复循环就地处理，预算耗尽后以 Failed 轮次收场，不走 Err；
//! 这里只有立即上浮、重试无法修复的错误：生成端故障与调用方输入错误。

use thiserror::Error;

use crate::llm::ProviderError;
use crate::plugins::PluginError;

/// 对调用方立即终止本轮的错误
#[derive(Error, Debug)]
pub enum PipelineError {
    /// 生成后端不可达或拒绝请求；恢复循环只处理脚本失败，不重试这里
    #[error("Generation provider error: {0}")]
    Provider(#[from] ProviderError),

    /// UnknownCapability / MissingParameter 等调用方错误
    #[error(transparent)]
    Plugin(#[from] PluginError),

    /// 调用方在轮与轮之间放弃了会话
    #[error("Request cancelled between turns")]
    Cancelled,
}
