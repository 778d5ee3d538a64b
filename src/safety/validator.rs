//! 脚本静态校验器
//!
//! 对生成的脚本做逐行词法扫描：禁止的 import、危险调用、输出目录之外的文件写入、
//! 无法静态解析的动态属性访问（fail closed）。纯函数，无 I/O；命中全部收集，不短路。

use std::fmt;

use regex::Regex;

use crate::safety::DenyRules;

/// 单条违规：命中的构造、1 起始行号、该行摘录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub construct: String,
    pub line: usize,
    pub excerpt: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {} ({})", self.line, self.construct, self.excerpt)
    }
}

/// 校验结论：allowed 为真表示未命中任何规则，不代表语义安全
#[derive(Debug, Clone)]
pub struct Verdict {
    pub allowed: bool,
    pub violations: Vec<Violation>,
}

impl Verdict {
    /// 将全部违规拼为一段诊断文本（用于恢复提示词与用户报告）
    pub fn report(&self) -> String {
        self.violations
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// 静态校验器：规则在构造期编译为正则，validate 本身无状态
pub struct ScriptValidator {
    rules: DenyRules,
    import_re: Regex,
    from_import_re: Regex,
    call_res: Vec<(String, Regex)>,
    dynamic_res: Vec<(String, Regex)>,
    open_any_re: Regex,
    open_literal_re: Regex,
}

/// 调用名编译为正则：裸名不允许前置 `.`（避免把方法调用当成同名内建），带模块前缀的按全名匹配
fn call_regex(name: &str) -> Regex {
    let escaped = regex::escape(name);
    let pattern = if name.contains('.') {
        format!(r"\b{}\s*\(", escaped)
    } else {
        format!(r"(?:^|[^.\w]){}\s*\(", escaped)
    };
    Regex::new(&pattern).expect("static call pattern")
}

impl ScriptValidator {
    pub fn new(rules: DenyRules) -> Self {
        let call_res = rules
            .denied_calls
            .iter()
            .map(|name| (name.clone(), call_regex(name)))
            .collect();
        let dynamic_res = rules
            .dynamic_access
            .iter()
            .map(|name| (name.clone(), call_regex(name)))
            .collect();
        Self {
            import_re: Regex::new(r"^\s*import\s+(.+)").expect("static import pattern"),
            from_import_re: Regex::new(r"^\s*from\s+([\w.]+)\s+import\b")
                .expect("static from-import pattern"),
            open_any_re: Regex::new(r"(?:^|[^.\w])open\s*\(").expect("static open pattern"),
            open_literal_re: Regex::new(r#"(?:^|[^.\w])open\s*\(\s*['"]([^'"]*)['"]"#)
                .expect("static open-literal pattern"),
            call_res,
            dynamic_res,
            rules,
        }
    }

    /// 校验脚本文本：收集全部命中后给出结论
    pub fn validate(&self, script: &str) -> Verdict {
        let mut violations = Vec::new();

        for (idx, raw_line) in script.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            self.check_imports(line, line_no, raw_line, &mut violations);
            self.check_calls(line, line_no, raw_line, &mut violations);
            self.check_file_access(line, line_no, raw_line, &mut violations);
        }

        Verdict {
            allowed: violations.is_empty(),
            violations,
        }
    }

    fn is_denied_module(&self, module: &str) -> bool {
        let root = module.split('.').next().unwrap_or(module);
        self.rules
            .denied_imports
            .iter()
            .any(|m| m == module || m == root)
    }

    fn check_imports(&self, line: &str, line_no: usize, raw: &str, out: &mut Vec<Violation>) {
        if let Some(caps) = self.import_re.captures(line) {
            // import a, b.c as d
            for part in caps[1].split(',') {
                let module = part.trim().split_whitespace().next().unwrap_or("");
                if self.is_denied_module(module) {
                    out.push(Violation {
                        construct: format!("denied import '{}'", module),
                        line: line_no,
                        excerpt: raw.trim().to_string(),
                    });
                }
            }
        }
        if let Some(caps) = self.from_import_re.captures(line) {
            let module = &caps[1];
            if self.is_denied_module(module) {
                out.push(Violation {
                    construct: format!("denied import 'from {}'", module),
                    line: line_no,
                    excerpt: raw.trim().to_string(),
                });
            }
        }
    }

    fn check_calls(&self, line: &str, line_no: usize, raw: &str, out: &mut Vec<Violation>) {
        for (name, re) in &self.call_res {
            if re.is_match(line) {
                out.push(Violation {
                    construct: format!("denied call '{}'", name),
                    line: line_no,
                    excerpt: raw.trim().to_string(),
                });
            }
        }
        for (name, re) in &self.dynamic_res {
            if re.is_match(line) {
                out.push(Violation {
                    construct: format!("dynamic access '{}' cannot be resolved statically", name),
                    line: line_no,
                    excerpt: raw.trim().to_string(),
                });
            }
        }
    }

    /// open()：字面量路径仅允许落在输出目录前缀下；非字面量路径无法静态解析，拒绝
    fn check_file_access(&self, line: &str, line_no: usize, raw: &str, out: &mut Vec<Violation>) {
        if !self.open_any_re.is_match(line) {
            return;
        }
        match self.open_literal_re.captures(line) {
            Some(caps) => {
                let path = &caps[1];
                if !path.starts_with(&self.rules.allowed_write_prefix) {
                    out.push(Violation {
                        construct: format!(
                            "file access outside '{}': open('{}')",
                            self.rules.allowed_write_prefix, path
                        ),
                        line: line_no,
                        excerpt: raw.trim().to_string(),
                    });
                }
            }
            None => {
                out.push(Violation {
                    construct: "file access with non-literal path cannot be resolved statically"
                        .to_string(),
                    line: line_no,
                    excerpt: raw.trim().to_string(),
                });
            }
        }
    }
}

impl Default for ScriptValidator {
    fn default() -> Self {
        Self::new(DenyRules::default())
    }
}
