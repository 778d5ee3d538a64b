//! 核心编排层：错误类型、恢复记录、请求流水线状态机

pub mod error;
pub mod orchestrator;
pub mod recovery;

pub use error::PipelineError;
pub use orchestrator::{Orchestrator, RequestReport};
pub use recovery::RecoveryAttempt;
