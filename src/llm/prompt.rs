//! 提示词模板
//!
//! 三类提示词：脚本生成、失败修复、会话摘要；另提供对 LLM 输出的 Markdown 代码栅栏剥离。

/// 所有生成请求共用的 system 提示词
pub const SYSTEM_PROMPT: &str = "You are an AI assistant integrated with a CAD application. \
Convert user requests into complete, safe, executable scripts for the host scripting API. \
Respond with only the script code, no explanation and no Markdown formatting.";

/// 脚本生成提示词：包装用户请求
pub fn generation_prompt(request: &str) -> String {
    format!(
        "Convert the following user request into a script for the host CAD application.\n\
         The script must be complete, safe, and executable.\n\n\
         User Request: {}\n\n\
         Provide only the script code without additional explanation.",
        request
    )
}

/// 修复提示词：携带上一次脚本与原始诊断，要求只修复该失败
///
/// 诊断原文必须原样带入：校验违规与执行错误在这一层无法区分成因，交给生成端判断。
pub fn fix_prompt(prior_script: &str, diagnostic: &str) -> String {
    format!(
        "The following script failed. Fix exactly the failure described below and return the \
         corrected script.\n\n\
         Script:\n{}\n\n\
         Failure:\n{}\n\n\
         Provide only the corrected script code without additional explanation.",
        prior_script, diagnostic
    )
}

/// 摘要提示词：将已有摘要与待压缩的轮次摘录合并为新摘要
pub fn summary_prompt(existing_summary: &str, digest: &str) -> String {
    format!(
        "Condense the following CAD session history into a short summary that preserves \
         what was built, what failed, and any named objects or dimensions.\n\n\
         Existing summary:\n{}\n\n\
         Turns to fold in:\n{}\n\n\
         Respond with only the updated summary text.",
        existing_summary, digest
    )
}

/// 剥离 Markdown 代码栅栏：生成端常无视指令把代码包进 ``` 块
pub fn strip_code_fences(output: &str) -> String {
    let trimmed = output.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }
    let mut lines: Vec<&str> = trimmed.lines().collect();
    lines.remove(0); // ``` 或 ```python
    if let Some(last) = lines.last() {
        if last.trim() == "```" {
            lines.pop();
        }
    }
    lines.join("\n").trim().to_string()
}
