//! 网络搜索服务 - 管线与基础Agent共用的检索接口
//!
//! 生产实现请求DuckDuckGo的HTML端点并用正则解析结果项，输出编号的
//! 纯文本结果（标题/URL/摘要），供上层做报告URL的模式匹配。

use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

use crate::utils::percent_decode;

const SEARCH_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

static RESULT_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<a[^>]*class="result__a"[^>]*href="([^"]+)"[^>]*>(.*?)</a>"#)
        .expect("invalid result link pattern")
});

static RESULT_SNIPPET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<a[^>]*class="result__snippet"[^>]*>(.*?)</a>"#)
        .expect("invalid result snippet pattern")
});

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("invalid tag pattern"));

/// 搜索服务接口
///
/// 返回格式化的结果文本；失败返回Err，由调用方按Transient策略重试。
#[async_trait]
pub trait SearchService: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<String>;
}

/// 单条搜索结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// DuckDuckGo搜索实现
pub struct DuckDuckGoSearch {
    client: reqwest::Client,
}

impl DuckDuckGoSearch {
    pub fn new(timeout_seconds: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .context("Failed to build search HTTP client")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl SearchService for DuckDuckGoSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<String> {
        println!("   🔎 正在搜索: {}", query);

        let response = self
            .client
            .get(SEARCH_ENDPOINT)
            .query(&[("q", query)])
            .send()
            .await
            .context(format!("Search request failed for query '{}'", query))?
            .error_for_status()
            .context("Search endpoint returned an error status")?;

        let html = response
            .text()
            .await
            .context("Failed to read search response body")?;

        let hits = parse_results(&html, max_results);
        println!("   🔎 搜索完成，获得{}条结果", hits.len());

        Ok(format_results(&hits))
    }
}

/// 从结果页HTML解析出结构化的结果项
pub fn parse_results(html: &str, max_results: usize) -> Vec<SearchHit> {
    let snippets: Vec<String> = RESULT_SNIPPET_RE
        .captures_iter(html)
        .map(|c| strip_tags(&c[1]))
        .collect();

    RESULT_LINK_RE
        .captures_iter(html)
        .take(max_results)
        .enumerate()
        .map(|(i, c)| SearchHit {
            title: strip_tags(&c[2]),
            url: resolve_redirect_url(&c[1]),
            snippet: snippets.get(i).cloned().unwrap_or_default(),
        })
        .collect()
}

/// 将结果项格式化为上层解析用的编号文本
pub fn format_results(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return "No relevant search results found.".to_string();
    }

    let mut formatted = String::from("Search Results:\n\n");
    for (i, hit) in hits.iter().enumerate() {
        formatted.push_str(&format!("{}. Title: {}\n", i + 1, hit.title));
        formatted.push_str(&format!("   URL: {}\n", hit.url));
        formatted.push_str(&format!("   Snippet: {}\n\n", hit.snippet));
    }

    formatted.trim_end().to_string()
}

/// 解开DuckDuckGo的跳转链接，还原真实目标URL
fn resolve_redirect_url(href: &str) -> String {
    if let Some(start) = href.find("uddg=") {
        let encoded = &href[start + 5..];
        let encoded = encoded.split('&').next().unwrap_or(encoded);
        return percent_decode(encoded);
    }

    if let Some(stripped) = href.strip_prefix("//") {
        return format!("https://{}", stripped);
    }
    href.to_string()
}

fn strip_tags(fragment: &str) -> String {
    TAG_RE.replace_all(fragment, "").trim().to_string()
}
