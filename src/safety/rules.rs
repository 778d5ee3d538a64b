//! 脚本校验规则数据
//!
//! 规则与扫描机制分离：DenyRules 是构造期注入的不可变配置，内容可由 [safety] 段扩展。
//! 默认清单针对宿主脚本环境里的误伤性操作：进程控制、文件删除、网络、动态执行。

use crate::config::SafetySection;

/// 默认禁止 import 的模块名（精确名或首段匹配，如 urllib.request 命中 urllib）
const DENIED_IMPORTS: &[&str] = &[
    "subprocess",
    "sys",
    "importlib",
    "urllib",
    "requests",
    "webbrowser",
    "socket",
    "ftplib",
    "shutil",
    "ctypes",
];

/// 默认禁止调用的函数名（含模块前缀的按全名匹配）
const DENIED_CALLS: &[&str] = &[
    "os.remove",
    "os.rmdir",
    "os.unlink",
    "shutil.rmtree",
    "subprocess.call",
    "subprocess.run",
    "subprocess.Popen",
    "exec",
    "eval",
    "compile",
    "__import__",
];

/// 动态属性访问原语：目标无法静态解析，一律拒绝（fail closed）
const DYNAMIC_ACCESS: &[&str] = &["getattr", "setattr", "delattr", "globals", "locals", "vars"];

/// 校验规则：不可变，构造后只读
#[derive(Debug, Clone)]
pub struct DenyRules {
    pub denied_imports: Vec<String>,
    pub denied_calls: Vec<String>,
    pub dynamic_access: Vec<String>,
    /// 允许脚本用 open() 写入的目录前缀
    pub allowed_write_prefix: String,
}

impl Default for DenyRules {
    fn default() -> Self {
        Self {
            denied_imports: DENIED_IMPORTS.iter().map(|s| s.to_string()).collect(),
            denied_calls: DENIED_CALLS.iter().map(|s| s.to_string()).collect(),
            dynamic_access: DYNAMIC_ACCESS.iter().map(|s| s.to_string()).collect(),
            allowed_write_prefix: "output/".to_string(),
        }
    }
}

impl DenyRules {
    /// 默认规则 + 配置追加项
    pub fn from_config(cfg: &SafetySection) -> Self {
        let mut rules = Self::default();
        if let Some(ref root) = cfg.output_root {
            rules.allowed_write_prefix = root.clone();
        }
        rules
            .denied_imports
            .extend(cfg.extra_denied_imports.iter().cloned());
        rules
            .denied_calls
            .extend(cfg.extra_denied_calls.iter().cloned());
        rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules_cover_original_denylist() {
        let rules = DenyRules::default();
        assert!(rules.denied_imports.iter().any(|m| m == "subprocess"));
        assert!(rules.denied_calls.iter().any(|c| c == "shutil.rmtree"));
        assert!(rules.dynamic_access.iter().any(|c| c == "getattr"));
    }

    #[test]
    fn test_config_extends_rules() {
        let cfg = SafetySection {
            output_root: Some("exports/".to_string()),
            extra_denied_imports: vec!["telnetlib".to_string()],
            extra_denied_calls: vec!["os.system".to_string()],
        };
        let rules = DenyRules::from_config(&cfg);
        assert_eq!(rules.allowed_write_prefix, "exports/");
        assert!(rules.denied_imports.iter().any(|m| m == "telnetlib"));
        assert!(rules.denied_calls.iter().any(|c| c == "os.system"));
    }
}
