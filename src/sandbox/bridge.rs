//! 宿主插件桥接沙箱
//!
//! 把脚本 POST 到宿主 CAD 插件暴露的本地端点（/execute），由插件在宿主进程内运行并回报结论。

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::sandbox::{ExecutionResult, ScriptSandbox};

/// HTTP 桥接：endpoint 形如 http://127.0.0.1:9040
pub struct BridgeSandbox {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Deserialize)]
struct BridgeResponse {
    success: bool,
    #[serde(default)]
    diagnostic: String,
}

impl BridgeSandbox {
    pub fn new(endpoint: &str, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ScriptSandbox for BridgeSandbox {
    async fn execute(&self, script: &str) -> ExecutionResult {
        let url = format!("{}/execute", self.endpoint);
        let response = self
            .client
            .post(&url)
            .json(&json!({ "script": script }))
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                return ExecutionResult {
                    success: false,
                    diagnostic: format!("Sandbox bridge unreachable: {}", e),
                }
            }
        };

        match response.json::<BridgeResponse>().await {
            Ok(body) => ExecutionResult {
                success: body.success,
                diagnostic: body.diagnostic,
            },
            Err(e) => ExecutionResult {
                success: false,
                diagnostic: format!("Sandbox bridge returned malformed response: {}", e),
            },
        }
    }
}
