//! DuckDuckGo 搜索（HTML 端点，无需 API Key）
//!
//! 解析 html.duckduckgo.com 的结果页：标题链接 `result__a`、摘要 `result__snippet`；
//! 跳转链接中的真实地址在 `uddg` 参数里。广告结果（y.js）跳过。

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, Url};

use crate::search::fetch::strip_html_tags;
use crate::search::{PageFetcher, SearchBackend, SearchError, SearchHit};

const PROVIDER: &str = "duckduckgo";
const ENDPOINT: &str = "https://html.duckduckgo.com/html/";

pub struct DuckDuckGoSearch {
    client: Client,
    fetcher: PageFetcher,
}

impl DuckDuckGoSearch {
    pub fn new(client: Client, fetcher: PageFetcher) -> Self {
        Self { client, fetcher }
    }
}

fn title_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)<a([^>]*class="result__a"[^>]*)>(.*?)</a>"#).expect("valid title regex")
    })
}

fn snippet_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)<(?:a|div)[^>]*class="result__snippet"[^>]*>(.*?)</(?:a|div)>"#)
            .expect("valid snippet regex")
    })
}

fn href_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"href="([^"]+)""#).expect("valid href regex"))
}

/// 解码常见 HTML 实体
fn decode_entities(s: &str) -> String {
    s.replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

fn clean_fragment(fragment: &str) -> String {
    decode_entities(&strip_html_tags(fragment)).trim().to_string()
}

/// 从 DuckDuckGo 跳转链接取出目标地址；直链原样返回
fn resolve_href(href: &str) -> Option<String> {
    let href = decode_entities(href);
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href
    };
    let url = Url::parse(&absolute).ok()?;
    let is_redirect = url
        .host_str()
        .map(|h| h.ends_with("duckduckgo.com"))
        .unwrap_or(false);
    if !is_redirect {
        return Some(absolute);
    }
    if url.path().ends_with("y.js") {
        return None;
    }
    url.query_pairs()
        .find(|(k, _)| k == "uddg")
        .map(|(_, v)| v.into_owned())
}

/// 解析结果页：每个标题之后、下一个标题之前的第一段摘要归属该结果
pub(crate) fn parse_results(html: &str, max_results: usize) -> Vec<SearchHit> {
    let titles: Vec<_> = title_re().captures_iter(html).collect();
    let snippets: Vec<_> = snippet_re().captures_iter(html).collect();

    let mut hits = Vec::new();
    for (i, cap) in titles.iter().enumerate() {
        if hits.len() >= max_results {
            break;
        }
        let (Some(whole), Some(attrs), Some(title)) = (cap.get(0), cap.get(1), cap.get(2)) else {
            continue;
        };
        let Some(url) = href_re()
            .captures(attrs.as_str())
            .and_then(|h| h.get(1))
            .and_then(|h| resolve_href(h.as_str()))
        else {
            continue;
        };
        let next_start = titles
            .get(i + 1)
            .and_then(|c| c.get(0))
            .map(|m| m.start())
            .unwrap_or(html.len());
        let snippet = snippets
            .iter()
            .filter_map(|s| s.get(0).zip(s.get(1)))
            .find(|(m, _)| m.start() >= whole.end() && m.start() < next_start)
            .map(|(_, inner)| clean_fragment(inner.as_str()))
            .unwrap_or_default();

        hits.push(SearchHit::new(clean_fragment(title.as_str()), url, snippet));
    }
    hits
}

#[async_trait]
impl SearchBackend for DuckDuckGoSearch {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
        fetch_full_page: bool,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let response = self
            .client
            .post(ENDPOINT)
            .form(&[("q", query)])
            .send()
            .await
            .map_err(|e| SearchError::Request {
                provider: PROVIDER,
                message: e.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(SearchError::Status {
                provider: PROVIDER,
                status: response.status().as_u16(),
            });
        }
        let html = response.text().await.map_err(|e| SearchError::Request {
            provider: PROVIDER,
            message: e.to_string(),
        })?;

        let mut hits = parse_results(&html, max_results);
        if fetch_full_page {
            self.fetcher.enrich(&mut hits).await;
        }
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<div class="result results_links">
  <h2 class="result__title">
    <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.rust-lang.org%2F&amp;rut=abc">The <b>Rust</b> Programming Language</a>
  </h2>
  <a class="result__snippet" href="//duckduckgo.com/l/?uddg=x">A language empowering everyone &amp; more.</a>
</div>
<div class="result results_links">
  <h2 class="result__title">
    <a rel="nofollow" class="result__a" href="https://duckduckgo.com/y.js?ad_provider=bing">Sponsored</a>
  </h2>
</div>
<div class="result results_links">
  <h2 class="result__title">
    <a rel="nofollow" class="result__a" href="https://doc.rust-lang.org/book/">The Book</a>
  </h2>
</div>
<div class="result results_links">
  <h2 class="result__title">
    <a rel="nofollow" class="result__a" href="https://crates.io/">crates.io</a>
  </h2>
  <a class="result__snippet" href="https://crates.io/">Rust package registry</a>
</div>
"#;

    #[test]
    fn test_parse_results_resolves_redirects_and_skips_ads() {
        let hits = parse_results(PAGE, 10);
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].url, "https://www.rust-lang.org/");
        assert_eq!(hits[0].title, "The Rust Programming Language");
        assert_eq!(hits[0].content, "A language empowering everyone & more.");
        assert_eq!(hits[1].url, "https://doc.rust-lang.org/book/");
        // 没有摘要的结果不能借用下一条的摘要
        assert_eq!(hits[1].content, "");
        assert_eq!(hits[2].content, "Rust package registry");
    }

    #[test]
    fn test_parse_results_respects_limit() {
        let hits = parse_results(PAGE, 1);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_parse_results_empty_page() {
        assert!(parse_results("<html><body>No results.</body></html>", 3).is_empty());
    }
}
