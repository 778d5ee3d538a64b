//! 会话层：轮次记录、上下文存储与持久化

pub mod context;
pub mod persistence;
pub mod turn;

pub use context::{ContextStore, Session, RECENT_TURNS};
pub use persistence::SessionStore;
pub use turn::{FailureStage, Turn, TurnOutcome};
