//! 恢复循环记录
//!
//! 一次恢复尝试的临时记录：携带上一次脚本与诊断，构造下一次生成的修复提示词。
//! 不持久化，循环退出即弃；最终结局由编排器折叠进 Turn。

use crate::llm::prompt::fix_prompt;

/// 单次恢复尝试：索引、上一次脚本、上一次诊断、下一次生成用的修复提示词
#[derive(Debug, Clone)]
pub struct RecoveryAttempt {
    pub attempt_index: u32,
    pub prior_script: String,
    pub prior_diagnostic: String,
    pub revised_prompt: String,
}

impl RecoveryAttempt {
    /// 由上一次失败构造；诊断原文原样带入修复提示词，成因判断交给生成端
    pub fn new(
        attempt_index: u32,
        prior_script: impl Into<String>,
        prior_diagnostic: impl Into<String>,
    ) -> Self {
        let prior_script = prior_script.into();
        let prior_diagnostic = prior_diagnostic.into();
        let revised_prompt = fix_prompt(&prior_script, &prior_diagnostic);
        Self {
            attempt_index,
            prior_script,
            prior_diagnostic,
            revised_prompt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revised_prompt_carries_script_and_raw_diagnostic() {
        let attempt = RecoveryAttempt::new(
            1,
            "adsk.core.thing()",
            "line 3: denied call 'eval' (eval(x))",
        );
        assert!(attempt.revised_prompt.contains("adsk.core.thing()"));
        assert!(attempt.revised_prompt.contains("denied call 'eval'"));
        assert_eq!(attempt.attempt_index, 1);
    }
}
