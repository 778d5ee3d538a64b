//! 流水线集成测试
//!
//! 用 Mock 生成端与 Mock 沙箱端到端验证：直通成功、校验拒绝后恢复、
//! 重试预算耗尽、插件分流与会话持久化。

use std::sync::Arc;

use forge::config::PluginsSection;
use forge::core::{Orchestrator, PipelineError};
use forge::llm::{MockGenerator, ProviderError};
use forge::plugins::PluginRegistry;
use forge::safety::ScriptValidator;
use forge::sandbox::MockSandbox;
use forge::session::{FailureStage, Session, SessionStore, TurnOutcome};

const MAX_RETRIES: u32 = 2;

fn orchestrator(generator: Arc<MockGenerator>, sandbox: Arc<MockSandbox>) -> Orchestrator {
    Orchestrator::new(
        generator,
        ScriptValidator::default(),
        sandbox,
        PluginRegistry::from_config(&PluginsSection::default()),
        Session::new(),
        100,
        MAX_RETRIES,
        5,
    )
}

#[tokio::test]
async fn test_clean_script_succeeds_first_attempt() {
    let generator = Arc::new(MockGenerator::with_responses([Ok(
        "import adsk.core\n\ndef create_cube():\n    pass\n\ncreate_cube()".to_string(),
    )]));
    let sandbox = Arc::new(MockSandbox::with_outcomes([MockSandbox::success()]));
    let mut orch = orchestrator(generator.clone(), sandbox.clone());

    let report = orch.process_request("create a cube 10x10x10").await.unwrap();

    assert!(report.turn.outcome.is_success());
    assert_eq!(report.turn.attempts, 1);
    assert!(report.recovery_trail.is_empty());
    assert_eq!(generator.calls(), 1);
    assert_eq!(sandbox.executed_scripts().len(), 1);
    assert_eq!(orch.session().turns.len(), 1);
}

#[tokio::test]
async fn test_validation_rejection_recovers_then_succeeds() {
    // 第一稿 import 了文件删除模块，第二稿干净
    let generator = Arc::new(MockGenerator::with_responses([
        Ok("import shutil\nshutil.rmtree('work')".to_string()),
        Ok("import adsk.core\nprint('clean')".to_string()),
    ]));
    let sandbox = Arc::new(MockSandbox::with_outcomes([MockSandbox::success()]));
    let mut orch = orchestrator(generator.clone(), sandbox.clone());

    let report = orch.process_request("clear the work folder").await.unwrap();

    assert!(report.turn.outcome.is_success());
    assert_eq!(report.turn.attempts, 2);
    // 被拒脚本从未进入沙箱
    assert_eq!(sandbox.executed_scripts().len(), 1);
    assert!(sandbox.executed_scripts()[0].contains("clean"));
    // 恢复轨迹记录了校验违规诊断
    assert_eq!(report.recovery_trail.len(), 1);
    assert!(report.recovery_trail[0].prior_diagnostic.contains("shutil"));
    assert!(report.recovery_trail[0]
        .revised_prompt
        .contains("shutil.rmtree"));
}

#[tokio::test]
async fn test_retry_budget_exhaustion_fails_with_last_diagnostic() {
    let generator = Arc::new(MockGenerator::with_responses([
        Ok("print('v1')".to_string()),
        Ok("print('v2')".to_string()),
        Ok("print('v3')".to_string()),
    ]));
    let sandbox = Arc::new(MockSandbox::with_outcomes([
        MockSandbox::failure("sketch plane missing"),
        MockSandbox::failure("sketch plane missing"),
        MockSandbox::failure("extrude target not found"),
    ]));
    let mut orch = orchestrator(generator.clone(), sandbox.clone());

    let report = orch.process_request("extrude the sketch").await.unwrap();

    // 生成次数不超过 max_retries + 1，且终态不是悬挂而是 Failed
    assert_eq!(generator.calls() as u32, MAX_RETRIES + 1);
    assert_eq!(report.turn.attempts, MAX_RETRIES + 1);
    match &report.turn.outcome {
        TurnOutcome::Failure { stage, diagnostic } => {
            assert_eq!(*stage, FailureStage::Execution);
            assert_eq!(diagnostic, "extrude target not found");
        }
        TurnOutcome::Success { .. } => panic!("expected failed turn"),
    }
    // 完整尝试轨迹对调用方可见
    assert_eq!(report.recovery_trail.len(), MAX_RETRIES as usize);
    let description = report.describe();
    assert!(description.contains("Execution"));
    assert!(description.contains("extrude target not found"));
}

#[tokio::test]
async fn test_plugin_capability_bypasses_generation() {
    let generator = Arc::new(MockGenerator::new());
    let sandbox = Arc::new(MockSandbox::new());
    let mut orch = orchestrator(generator.clone(), sandbox.clone());

    let report = orch
        .process_request("material_database material=aluminum")
        .await
        .unwrap();

    assert_eq!(generator.calls(), 0);
    assert!(sandbox.executed_scripts().is_empty());
    assert!(report.turn.script.is_empty());
    assert!(report.turn.outcome.diagnostic().contains("2.7"));
    assert_eq!(orch.session().turns.len(), 1);
}

#[tokio::test]
async fn test_provider_failure_is_terminal_and_recorded() {
    let generator = Arc::new(MockGenerator::with_responses([Err(
        ProviderError::Request("backend unreachable".to_string()),
    )]));
    let sandbox = Arc::new(MockSandbox::new());
    let mut orch = orchestrator(generator.clone(), sandbox.clone());

    let err = orch.process_request("create a gear").await.unwrap_err();
    assert!(matches!(err, PipelineError::Provider(_)));

    // 生成端故障不重试，但轮次仍然落账
    assert_eq!(generator.calls(), 1);
    assert_eq!(orch.session().turns.len(), 1);
    match &orch.session().turns[0].outcome {
        TurnOutcome::Failure { stage, .. } => assert_eq!(*stage, FailureStage::Generation),
        TurnOutcome::Success { .. } => panic!("expected failed turn"),
    }
}

#[tokio::test]
async fn test_code_fences_are_stripped_before_validation() {
    let generator = Arc::new(MockGenerator::with_responses([Ok(
        "```python\nimport adsk.core\nprint('fenced')\n```".to_string(),
    )]));
    let sandbox = Arc::new(MockSandbox::with_outcomes([MockSandbox::success()]));
    let mut orch = orchestrator(generator, sandbox.clone());

    let report = orch.process_request("make a plate").await.unwrap();

    assert!(report.turn.outcome.is_success());
    assert!(!report.turn.script.contains("```"));
    assert!(sandbox.executed_scripts()[0].starts_with("import adsk.core"));
}

#[tokio::test]
async fn test_session_round_trips_through_store() {
    let generator = Arc::new(MockGenerator::new());
    let sandbox = Arc::new(MockSandbox::new());
    let mut orch = orchestrator(generator, sandbox);

    orch.process_request("create a cube").await.unwrap();
    orch.process_request("material_database material=steel")
        .await
        .unwrap();
    orch.process_request("fillet the edges").await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::new(dir.path());
    let session = orch.into_session();
    let id = session.id;
    store.save(&session).unwrap();

    let loaded = store.load(&id).unwrap().unwrap();
    assert_eq!(loaded.turns.len(), 3);
    assert_eq!(loaded.turns[0].request, "create a cube");
    assert_eq!(loaded.turns[1].request, "material_database material=steel");
    assert!(loaded.turns[1].script.is_empty());
    assert_eq!(loaded.turns[2].request, "fillet the edges");
}
