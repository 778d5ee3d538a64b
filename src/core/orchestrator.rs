//! 请求流水线编排器
//!
//! Received → Classified → {Generating | PluginDispatch} → Validating → Executing →
//! {Succeeded | Recovering → Generating | Failed}。
//! 显式循环 + 尝试计数器实现状态机；每个终态都向 Context Store 追加一个 Turn。

use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::core::{PipelineError, RecoveryAttempt};
use crate::llm::prompt::{generation_prompt, strip_code_fences};
use crate::llm::ScriptGenerator;
use crate::plugins::PluginRegistry;
use crate::safety::ScriptValidator;
use crate::sandbox::{ExecutionResult, ScriptSandbox};
use crate::session::{ContextStore, FailureStage, Session, Turn, TurnOutcome};

/// 一轮请求的对外报告：已入会话的轮次 + 本轮恢复尝试轨迹（轨迹不持久化）
#[derive(Debug)]
pub struct RequestReport {
    pub turn: Turn,
    pub recovery_trail: Vec<RecoveryAttempt>,
}

impl RequestReport {
    /// 面向用户的失败描述：最终诊断、消耗的尝试数、最后失败发生在校验还是执行
    pub fn describe(&self) -> String {
        match &self.turn.outcome {
            TurnOutcome::Success { detail } if detail.is_empty() => {
                format!("Succeeded after {} attempt(s)", self.turn.attempts)
            }
            TurnOutcome::Success { detail } => {
                format!("Succeeded after {} attempt(s): {}", self.turn.attempts, detail)
            }
            TurnOutcome::Failure { stage, diagnostic } => format!(
                "Failed after {} attempt(s); last failure during {:?}:\n{}",
                self.turn.attempts, stage, diagnostic
            ),
        }
    }
}

/// 请求分类结论
#[derive(Debug)]
enum Route {
    Capability {
        name: String,
        params: HashMap<String, String>,
    },
    Script,
}

/// 编排器：独占一个会话，端到端同步处理单个请求
pub struct Orchestrator {
    generator: Arc<dyn ScriptGenerator>,
    validator: ScriptValidator,
    sandbox: Arc<dyn ScriptSandbox>,
    plugins: PluginRegistry,
    context: ContextStore,
    max_retries: u32,
    execute_timeout_secs: u64,
    cancel_token: CancellationToken,
}

/// 大小写、连字符与下划线不敏感的规范形（分隔符折叠为单个空格）
fn normalize(s: &str) -> String {
    s.to_lowercase()
        .replace(['-', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// 全部 token 都是 key=value 时给出参数表；否则 None
fn parse_params(tokens: &[&str]) -> Option<HashMap<String, String>> {
    let mut params = HashMap::new();
    for token in tokens {
        let (key, value) = token.split_once('=')?;
        if key.is_empty() {
            return None;
        }
        params.insert(key.to_string(), value.to_string());
    }
    Some(params)
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        generator: Arc<dyn ScriptGenerator>,
        validator: ScriptValidator,
        sandbox: Arc<dyn ScriptSandbox>,
        plugins: PluginRegistry,
        session: Session,
        summarize_threshold: usize,
        max_retries: u32,
        execute_timeout_secs: u64,
    ) -> Self {
        Self {
            generator,
            validator,
            sandbox,
            plugins,
            context: ContextStore::new(session, summarize_threshold),
            max_retries,
            execute_timeout_secs,
            cancel_token: CancellationToken::new(),
        }
    }

    pub fn session(&self) -> &Session {
        self.context.session()
    }

    /// 会话结束时交回 Session 以便持久化
    pub fn into_session(self) -> Session {
        self.context.into_session()
    }

    pub fn capability_names(&self) -> Vec<String> {
        self.plugins.capability_names()
    }

    /// 轮与轮之间放弃会话用；轮内（尤其是沙箱执行临界区）不检查
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// 分类：请求头部与某个能力名精确/近精确匹配、且其余 token 均为 key=value 时走插件；
    /// 含混情况（能力名后跟自由文本）一律落回脚本生成。
    fn classify(&self, request: &str) -> Route {
        let tokens: Vec<&str> = request.split_whitespace().collect();
        if tokens.is_empty() {
            return Route::Script;
        }
        for name in self.plugins.capability_names() {
            let name_norm = normalize(&name);
            // 能力名可能写成一个 token（material_database）也可能拆成多个（material database）
            for split in 1..=tokens.len() {
                let head = tokens[..split]
                    .iter()
                    .map(|t| normalize(t))
                    .collect::<Vec<_>>()
                    .join(" ");
                if head.len() > name_norm.len() {
                    break;
                }
                if head != name_norm {
                    continue;
                }
                if let Some(params) = parse_params(&tokens[split..]) {
                    return Route::Capability { name, params };
                }
                // 命中能力名但后续不是 key=value：含混，落回脚本生成
                break;
            }
        }
        Route::Script
    }

    /// 处理一条自然语言请求，终态时返回报告；生成端故障与调用方输入错误立即上浮
    pub async fn process_request(&mut self, request: &str) -> Result<RequestReport, PipelineError> {
        // Received：这是唯一允许放弃的位置
        if self.cancel_token.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        match self.classify(request) {
            Route::Capability { name, params } => {
                tracing::info!(capability = %name, "Request classified as capability call");
                self.dispatch_plugin(request, &name, params).await
            }
            Route::Script => {
                tracing::info!("Request classified as script generation");
                self.run_script_pipeline(request).await
            }
        }
    }

    /// 直接调用能力（也被 classify 命中的插件路径复用）；缺参/未知能力不会发起调用
    pub async fn dispatch_plugin(
        &mut self,
        request: &str,
        name: &str,
        params: HashMap<String, String>,
    ) -> Result<RequestReport, PipelineError> {
        let descriptor = self.plugins.resolve(name)?.clone();
        if let Some(parameter) = PluginRegistry::missing_parameter(&descriptor, &params) {
            return Err(crate::plugins::PluginError::MissingParameter {
                capability: descriptor.name,
                parameter,
            }
            .into());
        }

        let result = self.plugins.invoke(&descriptor, &params).await;
        let outcome = if result.success {
            TurnOutcome::Success {
                detail: result.output,
            }
        } else {
            TurnOutcome::Failure {
                stage: FailureStage::Execution,
                diagnostic: result.output,
            }
        };
        // 插件路径不经过脚本生成：脚本为空串，生成尝试数为 0
        let turn = Turn::new(request, "", outcome, 0);
        let report = RequestReport {
            turn: turn.clone(),
            recovery_trail: Vec::new(),
        };
        self.finish_turn(turn).await;
        Ok(report)
    }

    /// 脚本流水线：生成 → 校验 → 执行，失败进入有界恢复循环
    async fn run_script_pipeline(
        &mut self,
        request: &str,
    ) -> Result<RequestReport, PipelineError> {
        let base_prompt = generation_prompt(request);
        let context_payload = self.context.build_prompt(request);
        let mut trail: Vec<RecoveryAttempt> = Vec::new();
        let mut attempt: u32 = 0;

        let (script, outcome) = loop {
            // Generating：恢复轮用修复提示词，首轮用基础提示词
            let prompt = trail
                .last()
                .map(|a| a.revised_prompt.clone())
                .unwrap_or_else(|| base_prompt.clone());

            let raw = match self.generator.generate(&prompt, &context_payload).await {
                Ok(raw) => raw,
                Err(e) => {
                    // 生成端故障对本轮终止：记录 Failed 轮次后立即上浮
                    tracing::error!("Generation provider failed: {}", e);
                    let turn = Turn::new(
                        request,
                        "",
                        TurnOutcome::Failure {
                            stage: FailureStage::Generation,
                            diagnostic: e.to_string(),
                        },
                        attempt + 1,
                    );
                    self.finish_turn(turn).await;
                    return Err(e.into());
                }
            };
            let script = strip_code_fences(&raw);

            // Validating：被拒的脚本绝不进入沙箱
            let verdict = self.validator.validate(&script);
            let (stage, diagnostic) = if !verdict.allowed {
                tracing::warn!(
                    violations = verdict.violations.len(),
                    "Script rejected by safety validator"
                );
                (FailureStage::Validation, verdict.report())
            } else {
                // Executing：不可取消的临界区；超时等同执行失败，消耗一次重试
                let result = match tokio::time::timeout(
                    std::time::Duration::from_secs(self.execute_timeout_secs),
                    self.sandbox.execute(&script),
                )
                .await
                {
                    Ok(result) => result,
                    Err(_) => ExecutionResult {
                        success: false,
                        diagnostic: format!(
                            "Sandbox execution timed out after {}s",
                            self.execute_timeout_secs
                        ),
                    },
                };
                if result.success {
                    break (
                        script,
                        TurnOutcome::Success {
                            detail: result.diagnostic,
                        },
                    );
                }
                tracing::warn!("Sandbox reported failure: {}", result.diagnostic);
                (FailureStage::Execution, result.diagnostic)
            };

            // Recovering：预算内回到 Generating，否则 Failed
            if attempt >= self.max_retries {
                tracing::warn!(attempts = attempt + 1, "Retry budget exhausted");
                break (script, TurnOutcome::Failure { stage, diagnostic });
            }
            attempt += 1;
            tracing::info!(attempt, stage = ?stage, "Recovering with failure diagnostic");
            trail.push(RecoveryAttempt::new(attempt, script, diagnostic));
        };

        let turn = Turn::new(request, script, outcome, attempt + 1);
        let report = RequestReport {
            turn: turn.clone(),
            recovery_trail: trail,
        };
        self.finish_turn(turn).await;
        Ok(report)
    }

    /// 终态轮次入会话；append 之后按约定触发一次摘要检查
    async fn finish_turn(&mut self, turn: Turn) {
        self.context.append(turn);
        let generator = self.generator.clone();
        self.context.maybe_summarize(generator.as_ref()).await;
    }
}
