//! 网页搜索工具：DuckDuckGo HTML 端点
//!
//! GET 请求带超时与 User-Agent；用正则取出结果链接，html2text 清理标题，
//! 返回 "Searched the web for: <query>" 与前 N 条 "标题 - 链接"。

use std::time::Duration;

use async_trait::async_trait;
use html2text::from_read;
use regex::Regex;
use reqwest::Client;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::SearchSection;
use crate::react::ToolKind;
use crate::tools::Tool;

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// 单条搜索结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
}

/// 搜索工具初始化失败
#[derive(Debug, Error)]
pub enum SearchInitError {
    #[error("invalid result pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("http client: {0}")]
    Client(#[from] reqwest::Error),
}

pub struct SearchTool {
    client: Client,
    endpoint: String,
    max_results: usize,
    link_re: Regex,
    tag_re: Regex,
}

/// 解码 uddg 参数：'+' 为空格，其余 %XX 交给 urlencoding
fn decode_component(s: &str) -> String {
    let spaced = s.replace('+', " ");
    String::from_utf8_lossy(&urlencoding::decode_binary(spaced.as_bytes())).into_owned()
}

/// 跳转链接还原为目标地址：//duckduckgo.com/l/?uddg=<encoded>&rut=...
fn resolve_link(href: &str) -> String {
    let href = href.replace("&amp;", "&");
    if let Some(idx) = href.find("uddg=") {
        let rest = &href[idx + 5..];
        let encoded = rest.split('&').next().unwrap_or(rest);
        return decode_component(encoded);
    }
    if let Some(rest) = href.strip_prefix("//") {
        return format!("https://{}", rest);
    }
    href
}

/// 去掉标题内的高亮标签后交给 html2text 解码实体
fn clean_title(tag_re: &Regex, raw: &str) -> String {
    let stripped = tag_re.replace_all(raw, "");
    let text = match from_read(stripped.as_bytes(), 200) {
        Ok(t) => t,
        Err(_) => stripped.to_string(),
    };
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 带超时与 User-Agent 的 HTTP 客户端
fn build_client(timeout: Duration, user_agent: &str) -> Result<Client, SearchInitError> {
    Ok(Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .build()?)
}

impl SearchTool {
    pub fn new(cfg: &SearchSection) -> Result<Self, SearchInitError> {
        let client = build_client(Duration::from_secs(cfg.timeout_secs), USER_AGENT)?;
        Ok(Self {
            client,
            endpoint: cfg.endpoint.clone(),
            max_results: cfg.max_results,
            link_re: Regex::new(
                r#"(?s)<a[^>]*class="result__a"[^>]*href="([^"]+)"[^>]*>(.*?)</a>"#,
            )?,
            tag_re: Regex::new(r"<[^>]*>")?,
        })
    }

    /// 从结果页 HTML 中解析链接
    pub fn parse_results(&self, html: &str) -> Vec<SearchHit> {
        self.link_re
            .captures_iter(html)
            .filter_map(|c| {
                let url = resolve_link(c.get(1)?.as_str());
                let title = clean_title(&self.tag_re, c.get(2)?.as_str());
                Some(SearchHit { title, url })
            })
            .take(self.max_results)
            .collect()
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, String> {
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| format!("Request failed: {}", e))?;
        if !resp.status().is_success() {
            return Err(format!("HTTP {}", resp.status()));
        }
        let body = resp
            .text()
            .await
            .map_err(|e| format!("Read body: {}", e))?;
        Ok(self.parse_results(&body))
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn kind(&self) -> ToolKind {
        ToolKind::SearchWeb
    }

    async fn execute(&self, args: &Map<String, Value>) -> Result<String, String> {
        let query = args.get("query").and_then(|v| v.as_str()).unwrap_or("").trim();
        tracing::info!(query = %query, "search tool");
        let hits = self.search(query).await?;
        let mut out = format!("Searched the web for: {}", query);
        for (i, hit) in hits.iter().enumerate() {
            out.push_str(&format!("\n{}. {} - {}", i + 1, hit.title, hit.url));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<div class="result">
  <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.rust-lang.org%2F&amp;rut=abc">The <b>Rust</b> Programming Language</a>
</div>
<div class="result">
  <a rel="nofollow" class="result__a" href="https://doc.rust-lang.org/book/">The Book</a>
</div>
<div class="result">
  <a rel="nofollow" class="result__a" href="https://example.com/3">Third</a>
</div>
"#;

    #[test]
    fn test_parse_results() {
        let tool = SearchTool::new(&SearchSection {
            max_results: 2,
            ..SearchSection::default()
        })
        .unwrap();
        let hits = tool.parse_results(PAGE);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].url, "https://www.rust-lang.org/");
        assert_eq!(hits[0].title, "The Rust Programming Language");
        assert_eq!(hits[1].url, "https://doc.rust-lang.org/book/");
    }

    #[test]
    fn test_decode_component() {
        assert_eq!(decode_component("a%20b%2Fc"), "a b/c");
        assert_eq!(decode_component("rust+lang%3F"), "rust lang?");
        assert_eq!(decode_component("100%"), "100%");
    }

    #[test]
    fn test_bad_client_settings_are_reported() {
        let err = build_client(Duration::from_secs(5), "bad\nagent").unwrap_err();
        assert!(matches!(err, SearchInitError::Client(_)));
        assert!(build_client(Duration::from_secs(5), USER_AGENT).is_ok());
    }
}
