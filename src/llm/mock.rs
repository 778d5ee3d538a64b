//! Mock 生成客户端（用于测试，无需 API）
//!
//! 按 FIFO 返回预置的脚本或错误；队列耗尽后回落为一段回显请求的注释脚本，便于本地跑通流水线。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{ProviderError, ScriptGenerator};

/// Mock 客户端：预置响应队列 + 回显兜底；记录 generate 调用次数
#[derive(Debug, Default)]
pub struct MockGenerator {
    responses: Mutex<VecDeque<Result<String, ProviderError>>>,
    calls: AtomicUsize,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置一组响应，按 generate 调用顺序弹出
    pub fn with_responses<I>(responses: I) -> Self
    where
        I: IntoIterator<Item = Result<String, ProviderError>>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            calls: AtomicUsize::new(0),
        }
    }

    /// 追加一条预置响应
    pub fn push_response(&self, response: Result<String, ProviderError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    /// 累计 generate 调用次数
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScriptGenerator for MockGenerator {
    async fn generate(&self, prompt: &str, _context: &str) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(scripted) = self.responses.lock().unwrap().pop_front() {
            return scripted;
        }
        let first_line = prompt.lines().next().unwrap_or("");
        Ok(format!("# mock script for: {}\nprint(\"ok\")\n", first_line))
    }
}
