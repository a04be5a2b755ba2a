//! Finalizer：合并所有轮次的来源，抽取 URL，给出成功与否的判定

use std::collections::HashSet;

use crate::research::state::ResearchOutcome;

/// 摘要长度需超过该字符数才算有效
pub const SUMMARY_MIN_CHARS: usize = 50;
pub const SUMMARY_FAILED: &str = "Failed to generate summary";
pub const NO_SOURCES: &str = "No sources found";

/// 所有条目按行拆开，去掉空白行，按原文全局去重并保持首次出现顺序
pub fn dedup_source_lines<S: AsRef<str>>(entries: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut lines = Vec::new();
    for entry in entries {
        for line in entry.as_ref().split('\n') {
            if line.trim().is_empty() {
                continue;
            }
            if seen.insert(line) {
                lines.push(line.to_string());
            }
        }
    }
    lines
}

/// 以 `http` 开头的行（去除首尾空白后）即为来源 URL
pub fn extract_source_urls(lines: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    lines
        .iter()
        .map(|l| l.trim())
        .filter(|l| l.starts_with("http"))
        .filter(|l| seen.insert(*l))
        .map(String::from)
        .collect()
}

/// 生成终态结果；即使失败也返回带排版的部分摘要
pub fn finalize_summary<S: AsRef<str>>(summary: Option<&str>, gathered_sources: &[S]) -> ResearchOutcome {
    let lines = dedup_source_lines(gathered_sources);
    let source_urls = extract_source_urls(&lines);

    let has_summary = summary
        .map(|s| s.chars().count() > SUMMARY_MIN_CHARS)
        .unwrap_or(false);
    let has_sources = !source_urls.is_empty();
    let success = has_summary && has_sources;

    let error_reason = if success {
        None
    } else if !has_summary {
        Some(SUMMARY_FAILED.to_string())
    } else {
        Some(NO_SOURCES.to_string())
    };

    let final_summary = format!(
        "## Summary\n{}\n\n ### Sources:\n{}",
        summary.unwrap_or_default(),
        lines.join("\n")
    );

    ResearchOutcome {
        success,
        final_summary: Some(final_summary),
        source_urls,
        error_reason,
    }
}
