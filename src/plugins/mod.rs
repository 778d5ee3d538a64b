//! 插件注册表
//!
//! 能力名 -> 进程内调用或外部进程命令模板。请求被分类为非几何能力调用时由编排器查询；
//! 描述符启动时装载，之后只读。缺参是调用方错误（不发起调用），插件自身失败走 (success=false, 文本)。

pub mod external;
pub mod material;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub use material::MaterialDatabase;

use crate::config::PluginsSection;

/// 进程内能力：参数映射 -> 结果文本；Err 表示插件层面的执行失败
pub trait InProcessCapability: Send + Sync {
    fn call(&self, params: &HashMap<String, String>) -> Result<String, String>;
}

/// 调用方式：进程内直接调用，或外部进程命令模板（`{param}` 会被替换）
#[derive(Clone)]
pub enum InvocationKind {
    InProcess(Arc<dyn InProcessCapability>),
    External { command: String, args: Vec<String> },
}

impl fmt::Debug for InvocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvocationKind::InProcess(_) => write!(f, "InProcess"),
            InvocationKind::External { command, args } => {
                write!(f, "External {{ command: {:?}, args: {:?} }}", command, args)
            }
        }
    }
}

/// 注册表条目：能力名唯一
#[derive(Debug, Clone)]
pub struct PluginDescriptor {
    pub name: String,
    pub description: String,
    /// 请求必须提供的参数名
    pub required: Vec<String>,
    pub kind: InvocationKind,
}

/// 插件层错误：均为调用方/配置错误，重试无法修复
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("Unknown capability: {0}")]
    UnknownCapability(String),

    #[error("Capability '{capability}' missing required parameter '{parameter}'")]
    MissingParameter {
        capability: String,
        parameter: String,
    },

    #[error("Capability already registered: {0}")]
    AlreadyRegistered(String),
}

/// 调用结果：success 为插件自身的执行结论，output 为捕获的结果文本
#[derive(Debug, Clone)]
pub struct InvokeResult {
    pub success: bool,
    pub output: String,
}

/// 插件注册表：能力名到描述符的只读映射
pub struct PluginRegistry {
    plugins: HashMap<String, PluginDescriptor>,
    /// 外部进程的硬性墙钟超时（秒）
    timeout_secs: u64,
}

impl PluginRegistry {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            plugins: HashMap::new(),
            timeout_secs,
        }
    }

    /// 从配置装载：内建 material_database + [[plugins.external]] 条目
    pub fn from_config(cfg: &PluginsSection) -> Self {
        let mut registry = Self::new(cfg.timeout_secs);
        if let Err(e) = registry.register(MaterialDatabase::descriptor()) {
            tracing::error!("Failed to register built-in plugin: {}", e);
        }
        for entry in &cfg.external {
            let descriptor = PluginDescriptor {
                name: entry.name.clone(),
                description: entry.description.clone(),
                required: entry.params.clone(),
                kind: InvocationKind::External {
                    command: entry.command.clone(),
                    args: entry.args.clone(),
                },
            };
            if let Err(e) = registry.register(descriptor) {
                tracing::error!("Skipping external plugin '{}': {}", entry.name, e);
            }
        }
        registry
    }

    pub fn register(&mut self, descriptor: PluginDescriptor) -> Result<(), PluginError> {
        if self.plugins.contains_key(&descriptor.name) {
            return Err(PluginError::AlreadyRegistered(descriptor.name));
        }
        tracing::debug!(capability = %descriptor.name, "Registered plugin");
        self.plugins.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<&PluginDescriptor, PluginError> {
        self.plugins
            .get(name)
            .ok_or_else(|| PluginError::UnknownCapability(name.to_string()))
    }

    pub fn capability_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.plugins.keys().cloned().collect();
        names.sort();
        names
    }

    /// 缺失的首个必需参数；Some 时调用方不得发起 invoke
    pub fn missing_parameter(
        descriptor: &PluginDescriptor,
        params: &HashMap<String, String>,
    ) -> Option<String> {
        descriptor
            .required
            .iter()
            .find(|p| !params.contains_key(p.as_str()))
            .cloned()
    }

    /// 执行能力调用：进程内直接调用；外部进程带硬超时，到期强制终止
    pub async fn invoke(
        &self,
        descriptor: &PluginDescriptor,
        params: &HashMap<String, String>,
    ) -> InvokeResult {
        tracing::info!(capability = %descriptor.name, "Invoking plugin");
        match &descriptor.kind {
            InvocationKind::InProcess(callable) => match callable.call(params) {
                Ok(output) => InvokeResult {
                    success: true,
                    output,
                },
                Err(output) => InvokeResult {
                    success: false,
                    output,
                },
            },
            InvocationKind::External { command, args } => {
                external::run_external(command, args, params, self.timeout_secs).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo_descriptor() -> PluginDescriptor {
        struct Echo;
        impl InProcessCapability for Echo {
            fn call(&self, params: &HashMap<String, String>) -> Result<String, String> {
                Ok(params.get("text").cloned().unwrap_or_default())
            }
        }
        PluginDescriptor {
            name: "echo".to_string(),
            description: "echo back".to_string(),
            required: vec!["text".to_string()],
            kind: InvocationKind::InProcess(Arc::new(Echo)),
        }
    }

    #[test]
    fn test_resolve_unknown_capability() {
        let registry = PluginRegistry::new(5);
        let err = registry.resolve("nope").unwrap_err();
        assert!(matches!(err, PluginError::UnknownCapability(_)));
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let mut registry = PluginRegistry::new(5);
        registry.register(echo_descriptor()).unwrap();
        assert!(matches!(
            registry.register(echo_descriptor()),
            Err(PluginError::AlreadyRegistered(_))
        ));
    }

    #[test]
    fn test_missing_parameter_detected_before_invoke() {
        let descriptor = echo_descriptor();
        let missing = PluginRegistry::missing_parameter(&descriptor, &HashMap::new());
        assert_eq!(missing.as_deref(), Some("text"));

        let mut params = HashMap::new();
        params.insert("text".to_string(), "hi".to_string());
        assert!(PluginRegistry::missing_parameter(&descriptor, &params).is_none());
    }

    #[tokio::test]
    async fn test_in_process_invoke() {
        let mut registry = PluginRegistry::new(5);
        registry.register(echo_descriptor()).unwrap();
        let descriptor = registry.resolve("echo").unwrap();
        let mut params = HashMap::new();
        params.insert("text".to_string(), "hello".to_string());
        let result = registry.invoke(descriptor, &params).await;
        assert!(result.success);
        assert_eq!(result.output, "hello");
    }

    #[test]
    fn test_from_config_registers_builtin() {
        let registry = PluginRegistry::from_config(&crate::config::PluginsSection::default());
        assert!(registry.resolve("material_database").is_ok());
    }
}
