//! 整页抓取：GET 页面并转为可读文本
//!
//! 对 HTML 响应使用 html2text 提取正文，失败时退回简易去标签；单页失败不影响其他结果。

use html2text::from_read;
use reqwest::Client;

use crate::search::{SearchError, SearchHit};

const PROVIDER: &str = "fetch";

/// 整页抓取器（与后端共享同一个 HTTP Client）
#[derive(Clone)]
pub struct PageFetcher {
    client: Client,
}

/// 简易去除 HTML 标签（html2text 失败时的回退）
pub(crate) fn strip_html_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 判断内容是否像 HTML
fn looks_like_html(s: &str) -> bool {
    let s = s.trim_start();
    s.starts_with("<!")
        || s.starts_with("<html")
        || s.starts_with("<HTML")
        || (s.len() > 20
            && s.contains('<')
            && (s.contains("</") || s.contains("<meta") || s.contains("<head") || s.contains("<title")))
}

/// HTML 转可读文本
pub(crate) fn html_to_text(html: &str) -> String {
    match from_read(html.as_bytes(), 120) {
        Ok(text) if !text.trim().is_empty() => text,
        _ => strip_html_tags(html),
    }
}

impl PageFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn fetch_text(&self, url: &str) -> Result<String, SearchError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SearchError::Request {
                provider: PROVIDER,
                message: e.to_string(),
            })?;
        if !resp.status().is_success() {
            return Err(SearchError::Status {
                provider: PROVIDER,
                status: resp.status().as_u16(),
            });
        }
        let body = resp.text().await.map_err(|e| SearchError::Request {
            provider: PROVIDER,
            message: e.to_string(),
        })?;

        // 去除 BOM，避免 HTML 检测失败
        let body = body.strip_prefix('\u{FEFF}').unwrap_or(&body);
        if looks_like_html(body) {
            Ok(html_to_text(body))
        } else {
            Ok(body.to_string())
        }
    }

    /// 逐条抓取整页正文；失败的条目保留摘要作为正文
    pub async fn enrich(&self, hits: &mut [SearchHit]) {
        for hit in hits.iter_mut() {
            match self.fetch_text(&hit.url).await {
                Ok(text) => hit.raw_content = Some(text),
                Err(e) => {
                    tracing::warn!(url = %hit.url, error = %e, "full page fetch failed");
                    hit.raw_content = Some(hit.content.clone());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_html_tags() {
        assert_eq!(strip_html_tags("<p>Hello   <b>world</b></p>"), "Hello world");
    }

    #[test]
    fn test_looks_like_html() {
        assert!(looks_like_html("<!DOCTYPE html><html></html>"));
        assert!(looks_like_html("  <html><body>x</body></html>"));
        assert!(!looks_like_html("{\"json\": true}"));
    }

    #[test]
    fn test_html_to_text_keeps_content() {
        let text = html_to_text("<html><body><h1>Title</h1><p>Body text</p></body></html>");
        assert!(text.contains("Title"));
        assert!(text.contains("Body text"));
        assert!(!text.contains("<p>"));
    }
}
