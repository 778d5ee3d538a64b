//! 外部进程插件调用
//!
//! 参数替换进固定命令模板（命令名不参与替换），子进程带硬性墙钟超时；
//! 到期通过 kill_on_drop 强制终止，结果一律以 (success, 文本) 报告，不抛错。

use std::collections::HashMap;
use std::process::Stdio;

use tokio::process::Command;

use crate::plugins::InvokeResult;

/// 将 `{key}` 占位符替换为参数值
fn substitute(template: &str, params: &HashMap<String, String>) -> String {
    let mut rendered = template.to_string();
    for (key, value) in params {
        rendered = rendered.replace(&format!("{{{}}}", key), value);
    }
    rendered
}

/// 运行外部进程能力：捕获 stdout/stderr，超时即失败
pub async fn run_external(
    command: &str,
    args: &[String],
    params: &HashMap<String, String>,
    timeout_secs: u64,
) -> InvokeResult {
    let rendered: Vec<String> = args.iter().map(|a| substitute(a, params)).collect();
    tracing::info!(command = %command, args = ?rendered, "external plugin execute");

    let mut cmd = Command::new(command);
    cmd.args(&rendered)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            return InvokeResult {
                success: false,
                output: format!("Failed to start '{}': {}", command, e),
            }
        }
    };

    let output = match tokio::time::timeout(
        std::time::Duration::from_secs(timeout_secs),
        child.wait_with_output(),
    )
    .await
    {
        // 超时：wait_with_output 的 future 被丢弃，kill_on_drop 终止子进程
        Err(_) => {
            tracing::warn!(command = %command, "external plugin timed out, killing");
            return InvokeResult {
                success: false,
                output: format!("Plugin timed out after {}s", timeout_secs),
            };
        }
        Ok(Err(e)) => {
            return InvokeResult {
                success: false,
                output: format!("Plugin wait failed: {}", e),
            }
        }
        Ok(Ok(output)) => output,
    };

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let text = if stderr.is_empty() {
        stdout
    } else if stdout.is_empty() {
        stderr
    } else {
        format!("{}\nstderr: {}", stdout, stderr)
    };

    InvokeResult {
        success: output.status.success(),
        output: text,
    }
}
