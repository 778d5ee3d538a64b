//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `FORGE__*` 覆盖（双下划线表示嵌套，如 `FORGE__LLM__PROVIDER=ollama`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub pipeline: PipelineSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub safety: SafetySection,
    #[serde(default)]
    pub sandbox: SandboxSection,
    #[serde(default)]
    pub plugins: PluginsSection,
}

/// [app] 段：应用名、会话持久化目录
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppSection {
    pub name: Option<String>,
    /// 会话 JSON 存放目录，未设置时用 ./sessions
    pub session_dir: Option<PathBuf>,
}

/// [pipeline] 段：恢复循环与上下文压缩
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    /// 单轮请求允许的恢复重试次数（总生成次数 = max_retries + 1）
    pub max_retries: u32,
    /// 会话轮数超过此值时触发摘要压缩
    pub summarize_threshold: usize,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            max_retries: 2,
            summarize_threshold: 12,
        }
    }
}

/// [llm] 段：后端选择与超时
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 后端：openai（兼容端点，含 DeepSeek / LM Studio）/ ollama / mock
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// OpenAI 兼容端点的 base_url；Ollama 的服务地址
    pub base_url: Option<String>,
    /// 单次生成请求超时（秒）
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_request_timeout() -> u64 {
    60
}

/// [safety] 段：脚本校验规则扩展与允许写入的输出目录
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SafetySection {
    /// 允许脚本写文件的目录前缀，未设置时用 ./output
    pub output_root: Option<String>,
    /// 追加到默认规则的禁止 import 模块名
    #[serde(default)]
    pub extra_denied_imports: Vec<String>,
    /// 追加到默认规则的禁止调用名
    #[serde(default)]
    pub extra_denied_calls: Vec<String>,
}

/// [sandbox] 段：宿主 CAD 执行端
#[derive(Debug, Clone, Deserialize)]
pub struct SandboxSection {
    /// 宿主插件桥接端点（如 http://127.0.0.1:9040）；未设置时以 dry-run 模式运行
    pub bridge_url: Option<String>,
    /// 单次脚本执行超时（秒）
    #[serde(default = "default_execute_timeout")]
    pub execute_timeout_secs: u64,
}

impl Default for SandboxSection {
    fn default() -> Self {
        Self {
            bridge_url: None,
            execute_timeout_secs: default_execute_timeout(),
        }
    }
}

fn default_execute_timeout() -> u64 {
    120
}

/// [plugins] 段：外部进程插件与超时
#[derive(Debug, Clone, Deserialize)]
pub struct PluginsSection {
    /// 外部进程插件的硬性墙钟超时（秒），到期强制终止
    #[serde(default = "default_plugin_timeout")]
    pub timeout_secs: u64,
    /// 外部进程插件声明
    #[serde(default)]
    pub external: Vec<ExternalPluginEntry>,
}

impl Default for PluginsSection {
    fn default() -> Self {
        Self {
            timeout_secs: default_plugin_timeout(),
            external: Vec::new(),
        }
    }
}

fn default_plugin_timeout() -> u64 {
    30
}

/// [[plugins.external]] 条目：命令模板中 `{param}` 会被请求参数替换
#[derive(Debug, Clone, Deserialize)]
pub struct ExternalPluginEntry {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// 调用方必须提供的参数名
    #[serde(default)]
    pub params: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app: AppSection::default(),
            pipeline: PipelineSection::default(),
            llm: LlmSection::default(),
            safety: SafetySection::default(),
            sandbox: SandboxSection::default(),
            plugins: PluginsSection::default(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 FORGE__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 FORGE__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("FORGE")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.pipeline.max_retries, 2);
        assert_eq!(cfg.pipeline.summarize_threshold, 12);
        assert_eq!(cfg.llm.provider, "openai");
        assert!(cfg.sandbox.bridge_url.is_none());
        assert!(cfg.plugins.external.is_empty());
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let cfg = load_config(Some(PathBuf::from("/nonexistent/forge.toml"))).unwrap();
        assert_eq!(cfg.plugins.timeout_secs, 30);
        assert_eq!(cfg.sandbox.execute_timeout_secs, 120);
    }
}
