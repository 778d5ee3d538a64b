//! 会话与上下文存储
//!
//! Session 持有有序轮次与滚动摘要；ContextStore 独占一个 Session，负责拼生成上下文
//! 与阈值触发的摘要压缩。轮次只会按追加顺序读出，压缩只折叠前缀、从不重排。

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::llm::prompt::summary_prompt;
use crate::llm::ScriptGenerator;
use crate::session::Turn;

/// 拼入提示词的最近原始轮次数（固定窗口）
pub const RECENT_TURNS: usize = 5;

/// 一个长会话的全部状态；通过 SessionStore 以 JSON 无损往返
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub turns: Vec<Turn>,
    #[serde(default)]
    pub summary: String,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            turns: Vec::new(),
            summary: String::new(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// 上下文存储：append / build_prompt / maybe_summarize
pub struct ContextStore {
    session: Session,
    summarize_threshold: usize,
}

impl ContextStore {
    pub fn new(session: Session, summarize_threshold: usize) -> Self {
        Self {
            session,
            summarize_threshold,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// 交回 Session（用于会话结束时持久化）
    pub fn into_session(self) -> Session {
        self.session
    }

    /// 追加一个已终态的轮次；轮次追加后不可变
    pub fn append(&mut self, turn: Turn) {
        self.session.turns.push(turn);
    }

    /// 拼生成上下文：滚动摘要（如有）+ 最近 RECENT_TURNS 个原始轮次
    pub fn context_payload(&self) -> String {
        let mut sections = Vec::new();
        if !self.session.summary.is_empty() {
            sections.push(format!("## Session summary\n{}", self.session.summary));
        }
        let turns = &self.session.turns;
        if !turns.is_empty() {
            let start = turns.len().saturating_sub(RECENT_TURNS);
            let blocks: Vec<String> = turns[start..].iter().map(|t| t.prompt_block()).collect();
            sections.push(format!("## Recent turns\n{}", blocks.join("\n---\n")));
        }
        sections.join("\n\n")
    }

    /// 拼完整提示词负载：上下文 + 当前请求；输出始终以请求文本结尾
    pub fn build_prompt(&self, request: &str) -> String {
        let context = self.context_payload();
        if context.is_empty() {
            request.to_string()
        } else {
            format!("{}\n\n## Current request\n{}", context, request)
        }
    }

    /// 每次 append 后调用：轮次数超过阈值时，将最近 RECENT_TURNS 之前的前缀折叠进摘要
    ///
    /// 摘要本身委托给生成端（独立提示词类型）；生成端不可用时退化为确定性截断：
    /// 每个被折叠的轮次以一行 digest 追加到现有摘要（见 DESIGN.md 的决策记录）。
    pub async fn maybe_summarize(&mut self, generator: &dyn ScriptGenerator) {
        if self.session.turns.len() <= self.summarize_threshold {
            return;
        }
        let keep_from = self.session.turns.len().saturating_sub(RECENT_TURNS);
        if keep_from == 0 {
            return;
        }

        let folded: Vec<Turn> = self.session.turns.drain(..keep_from).collect();
        let digest = folded
            .iter()
            .map(|t| t.digest())
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = summary_prompt(&self.session.summary, &digest);
        match generator.generate(&prompt, "").await {
            Ok(summary) if !summary.trim().is_empty() => {
                self.session.summary = summary.trim().to_string();
                tracing::debug!(folded = folded.len(), "Session prefix summarized");
            }
            Ok(_) | Err(_) => {
                // 确定性回退：digest 行追加进现有摘要
                tracing::warn!(
                    folded = folded.len(),
                    "Summarization backend unavailable, falling back to truncate-oldest digest"
                );
                if self.session.summary.is_empty() {
                    self.session.summary = digest;
                } else {
                    self.session.summary = format!("{}\n{}", self.session.summary, digest);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockGenerator, ProviderError};
    use crate::session::{FailureStage, TurnOutcome};

    fn ok_turn(request: &str) -> Turn {
        Turn::new(
            request,
            format!("# script for {}", request),
            TurnOutcome::Success {
                detail: String::new(),
            },
            1,
        )
    }

    #[test]
    fn test_build_prompt_ends_with_request() {
        let mut store = ContextStore::new(Session::new(), 12);
        store.append(ok_turn("make a plate"));
        let prompt = store.build_prompt("drill a hole");
        assert!(prompt.ends_with("drill a hole"));
    }

    #[test]
    fn test_empty_session_prompt_is_just_request() {
        let store = ContextStore::new(Session::new(), 12);
        assert_eq!(store.build_prompt("create a cube"), "create a cube");
    }

    #[test]
    fn test_context_limited_to_recent_turns() {
        let mut store = ContextStore::new(Session::new(), 100);
        for i in 0..10 {
            store.append(ok_turn(&format!("request-{}", i)));
        }
        let context = store.context_payload();
        // 只有最近 RECENT_TURNS 个轮次进入上下文
        assert!(!context.contains("request-4"));
        for i in 5..10 {
            assert!(context.contains(&format!("request-{}", i)));
        }
    }

    #[test]
    fn test_turns_keep_append_order() {
        let mut store = ContextStore::new(Session::new(), 100);
        store.append(ok_turn("first"));
        store.append(ok_turn("second"));
        let context = store.context_payload();
        let first = context.find("first").unwrap();
        let second = context.find("second").unwrap();
        assert!(first < second);
    }

    #[tokio::test]
    async fn test_summarize_below_threshold_is_noop() {
        let mut store = ContextStore::new(Session::new(), 8);
        for i in 0..8 {
            store.append(ok_turn(&format!("r{}", i)));
        }
        store.maybe_summarize(&MockGenerator::new()).await;
        assert_eq!(store.session().turns.len(), 8);
        assert!(store.session().summary.is_empty());
    }

    #[tokio::test]
    async fn test_summarize_folds_prefix_via_generator() {
        let generator =
            MockGenerator::with_responses([Ok("built plates and holes".to_string())]);
        let mut store = ContextStore::new(Session::new(), 6);
        for i in 0..9 {
            store.append(ok_turn(&format!("r{}", i)));
        }
        store.maybe_summarize(&generator).await;
        assert_eq!(store.session().turns.len(), RECENT_TURNS);
        assert_eq!(store.session().summary, "built plates and holes");
        // 保留的是最新的 RECENT_TURNS 个
        assert_eq!(store.session().turns[0].request, "r4");
    }

    #[tokio::test]
    async fn test_summarize_fallback_is_deterministic_truncation() {
        let generator = MockGenerator::with_responses([Err(ProviderError::Request(
            "backend down".to_string(),
        ))]);
        let mut store = ContextStore::new(Session::new(), 6);
        let mut failing = ok_turn("r0");
        failing.outcome = TurnOutcome::Failure {
            stage: FailureStage::Execution,
            diagnostic: "sketch error".to_string(),
        };
        store.append(failing);
        for i in 1..9 {
            store.append(ok_turn(&format!("r{}", i)));
        }
        store.maybe_summarize(&generator).await;
        assert_eq!(store.session().turns.len(), RECENT_TURNS);
        // 回退摘要保留每个被折叠轮次的一行 digest，失败不被静默丢弃
        assert!(store.session().summary.contains("\"r0\" -> failed"));
        assert!(store.session().summary.contains("sketch error"));
        assert!(store.session().summary.contains("\"r3\" -> ok"));
    }
}
