//! 会话轮次
//!
//! 一次请求/响应交换的不可变记录；追加进 Session 后不再修改。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 失败发生的阶段：区分「生成端不可用」「产出了不安全脚本」「脚本没跑起来」
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureStage {
    Generation,
    Validation,
    Execution,
}

/// 轮次结局：终态成功或终态失败，二者必居其一
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnOutcome {
    Success {
        detail: String,
    },
    Failure {
        stage: FailureStage,
        diagnostic: String,
    },
}

impl TurnOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TurnOutcome::Success { .. })
    }

    pub fn diagnostic(&self) -> &str {
        match self {
            TurnOutcome::Success { detail } => detail,
            TurnOutcome::Failure { diagnostic, .. } => diagnostic,
        }
    }
}

/// 单个轮次：请求、最终脚本（插件路径为空串）、结局、时间戳、消耗的生成次数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub request: String,
    pub script: String,
    pub outcome: TurnOutcome,
    pub timestamp: DateTime<Utc>,
    pub attempts: u32,
}

impl Turn {
    pub fn new(
        request: impl Into<String>,
        script: impl Into<String>,
        outcome: TurnOutcome,
        attempts: u32,
    ) -> Self {
        Self {
            request: request.into(),
            script: script.into(),
            outcome,
            timestamp: Utc::now(),
            attempts,
        }
    }

    /// 单行摘录：用于摘要压缩的确定性回退与日志
    pub fn digest(&self) -> String {
        match &self.outcome {
            TurnOutcome::Success { .. } => format!("\"{}\" -> ok", self.request),
            TurnOutcome::Failure { stage, diagnostic } => {
                let brief: String = diagnostic.chars().take(80).collect();
                format!("\"{}\" -> failed ({:?}): {}", self.request, stage, brief)
            }
        }
    }

    /// 提示词上下文中一个轮次的展开形式
    pub fn prompt_block(&self) -> String {
        let outcome = match &self.outcome {
            TurnOutcome::Success { detail } if detail.is_empty() => "success".to_string(),
            TurnOutcome::Success { detail } => format!("success: {}", detail),
            TurnOutcome::Failure { stage, diagnostic } => {
                format!("failed ({:?}): {}", stage, diagnostic)
            }
        };
        if self.script.is_empty() {
            format!("Request: {}\nOutcome: {}", self.request, outcome)
        } else {
            format!(
                "Request: {}\nScript:\n{}\nOutcome: {}",
                self.request, self.script, outcome
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_truncates_long_diagnostics() {
        let diag = "x".repeat(200);
        let turn = Turn::new(
            "req",
            "",
            TurnOutcome::Failure {
                stage: FailureStage::Execution,
                diagnostic: diag,
            },
            3,
        );
        assert!(turn.digest().len() < 120);
        assert!(turn.digest().contains("failed (Execution)"));
    }

    #[test]
    fn test_prompt_block_omits_empty_script() {
        let turn = Turn::new(
            "material steel",
            "",
            TurnOutcome::Success {
                detail: "density 7.85".to_string(),
            },
            0,
        );
        let block = turn.prompt_block();
        assert!(!block.contains("Script:"));
        assert!(block.contains("material steel"));
    }
}
