//! Forge - Rust CAD 智能脚本系统
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 编排器、恢复循环、错误类型
//! - **llm**: 生成客户端抽象与实现（OpenAI 兼容 / Ollama / Mock）
//! - **plugins**: 能力注册表（进程内 + 外部进程）
//! - **safety**: 脚本静态校验（规则数据 + 词法扫描）
//! - **sandbox**: 宿主执行边界（HTTP 桥接 / dry-run / Mock）
//! - **session**: 轮次记录、上下文存储与持久化

pub mod config;
pub mod core;
pub mod llm;
pub mod plugins;
pub mod safety;
pub mod sandbox;
pub mod session;
