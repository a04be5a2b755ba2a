//! 来源聚合：把搜索结果整理成喂给模型的文本，以及引用用的 URL 清单

use std::collections::HashSet;

use crate::search::SearchHit;

/// 粗略估算：1 token ≈ 4 字符
pub const CHARS_PER_TOKEN: usize = 4;
pub const MAX_TOKENS_PER_SOURCE: usize = 1000;
const TRUNCATION_MARKER: &str = "... [truncated]";

/// 按 URL 去重（保留首次出现），不重新排序
fn unique_by_url(hits: &[SearchHit]) -> Vec<&SearchHit> {
    let mut seen = HashSet::new();
    hits.iter().filter(|h| seen.insert(h.url.as_str())).collect()
}

/// 超过预算则按字符截断并附加标记
fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}{}", &text[..idx], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}

/// 生成模型可读的来源文本
///
/// 关闭整页抓取时只有摘要片段；开启时附加全文，每个来源不超过 `max_tokens_per_source` 对应的字符数。
/// 没有全文的结果以空串占位。
pub fn deduplicate_and_format_sources(
    hits: &[SearchHit],
    max_tokens_per_source: usize,
    fetch_full_page: bool,
) -> String {
    let mut out = String::from("Sources:\n\n");
    let char_limit = max_tokens_per_source * CHARS_PER_TOKEN;
    for hit in unique_by_url(hits) {
        out.push_str(&format!("Source: {}\n===\n", hit.title));
        out.push_str(&format!("URL: {}\n===\n", hit.url));
        out.push_str(&format!(
            "Most relevant content from source: {}\n===\n",
            hit.content
        ));
        if fetch_full_page {
            let raw = hit.raw_content.as_deref().unwrap_or_default();
            out.push_str(&format!(
                "Full source content limited to {} tokens: {}\n\n",
                max_tokens_per_source,
                truncate_chars(raw, char_limit)
            ));
        }
    }
    out.trim().to_string()
}

/// 引用清单：每条结果一行 URL，与 token 预算无关
pub fn format_source_urls(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|h| h.url.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
