//! 脚本安全层：规则数据与静态扫描

pub mod rules;
pub mod validator;

pub use rules::DenyRules;
pub use validator::{ScriptValidator, Verdict, Violation};
