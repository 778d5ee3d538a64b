//! Mock 沙箱（用于测试，无需宿主环境）
//!
//! 按 FIFO 返回预置的执行结论并记录收到的脚本；队列耗尽后一律报告成功。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::sandbox::{ExecutionResult, ScriptSandbox};

/// Mock 沙箱：预置结论队列 + 已执行脚本记录
#[derive(Debug, Default)]
pub struct MockSandbox {
    outcomes: Mutex<VecDeque<ExecutionResult>>,
    executed: Mutex<Vec<String>>,
}

impl MockSandbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置一组执行结论，按 execute 调用顺序弹出
    pub fn with_outcomes<I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = ExecutionResult>,
    {
        Self {
            outcomes: Mutex::new(outcomes.into_iter().collect()),
            executed: Mutex::new(Vec::new()),
        }
    }

    /// 构造一个失败结论
    pub fn failure(diagnostic: impl Into<String>) -> ExecutionResult {
        ExecutionResult {
            success: false,
            diagnostic: diagnostic.into(),
        }
    }

    /// 构造一个成功结论
    pub fn success() -> ExecutionResult {
        ExecutionResult {
            success: true,
            diagnostic: String::new(),
        }
    }

    /// 已提交执行的脚本，按顺序
    pub fn executed_scripts(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl ScriptSandbox for MockSandbox {
    async fn execute(&self, script: &str) -> ExecutionResult {
        self.executed.lock().unwrap().push(script.to_string());
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(MockSandbox::success)
    }
}
