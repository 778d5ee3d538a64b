//! 执行沙箱边界
//!
//! 宿主 CAD 环境是不透明协作方：核心只消费 execute 返回的粗粒度结论
//! （成功与否 + 诊断文本），从不触碰宿主对象类型。

pub mod bridge;
pub mod mock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use bridge::BridgeSandbox;
pub use mock::MockSandbox;

/// 一次脚本执行的结论
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub diagnostic: String,
}

/// 执行沙箱 trait：在宿主环境中运行已通过校验的脚本
///
/// 传输层故障同样以 success=false + 诊断报告；该调用是轮内不可取消的临界区。
#[async_trait]
pub trait ScriptSandbox: Send + Sync {
    async fn execute(&self, script: &str) -> ExecutionResult;
}

/// Dry-run 沙箱：未配置桥接端点时使用，不执行脚本、直接报告成功
#[derive(Debug, Default)]
pub struct DryRunSandbox;

#[async_trait]
impl ScriptSandbox for DryRunSandbox {
    async fn execute(&self, _script: &str) -> ExecutionResult {
        ExecutionResult {
            success: true,
            diagnostic: "dry-run: no sandbox bridge configured, script not executed".to_string(),
        }
    }
}
