//! 报告获取与文本提取阶段
//!
//! 下载器在HTTP传输之上实现URL校验与固定间隔的有界重试；提取器把缓存好的
//! PDF逐页转为纯文本。两者的失败都折算为哨兵结果，不向外抛异常。

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::DocumentCache;
use crate::config::FetchConfig;
use crate::types::{StageError, TextOutcome};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// 单次HTTP获取的响应体
pub struct FetchedBody {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// HTTP传输接口：单次GET，不含重试
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str) -> Result<FetchedBody, StageError>;
}

/// reqwest传输实现
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout_seconds: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .context("Failed to build download HTTP client")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<FetchedBody, StageError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| StageError::Transient(format!("Request failed: {}", e)))?
            .error_for_status()
            .map_err(|e| StageError::Transient(format!("Bad response status: {}", e)))?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_lowercase());

        let bytes = response
            .bytes()
            .await
            .map_err(|e| StageError::Transient(format!("Failed to read response body: {}", e)))?
            .to_vec();

        Ok(FetchedBody {
            bytes,
            content_type,
        })
    }
}

/// 报告下载器：URL校验 + 有界重试
pub struct ReportDownloader {
    transport: Arc<dyn HttpTransport>,
    config: FetchConfig,
}

impl ReportDownloader {
    pub fn new(transport: Arc<dyn HttpTransport>, config: FetchConfig) -> Self {
        Self { transport, config }
    }

    /// 下载报告字节
    ///
    /// 非http/https的URL快速失败不重试。其余任何请求失败（包括4xx）都
    /// 按同一策略重试到上限——对永久失败会浪费重试，属已知的简化取舍。
    pub async fn download(&self, url: &str) -> Result<Vec<u8>, StageError> {
        validate_url(url)?;

        let attempts = self.config.retry_attempts.max(1);
        let mut last_error = StageError::Transient("No attempt made".to_string());

        for attempt in 1..=attempts {
            match self.transport.get(url).await {
                Ok(body) => {
                    if let Some(content_type) = &body.content_type
                        && !content_type.contains("application/pdf")
                        && !content_type.contains("application/octet-stream")
                    {
                        // content-type仅作提示，字节仍然保留
                        eprintln!(
                            "   ⚠️ {} 的Content-Type为'{}'，并非PDF，仍然保留下载内容",
                            url, content_type
                        );
                    }
                    return Ok(body.bytes);
                }
                Err(e) => {
                    eprintln!(
                        "   ❌ 下载失败 (第 {} / {} 次尝试): {}: {}",
                        attempt, attempts, url, e
                    );
                    last_error = e;
                    if attempt < attempts {
                        tokio::time::sleep(Duration::from_secs(self.config.retry_delay_secs)).await;
                    }
                }
            }
        }

        Err(StageError::Transient(format!(
            "Failed to download report from {} after {} attempts: {}",
            url, attempts, last_error
        )))
    }
}

/// 文本提取接口：PDF字节 → 逐页文本
pub trait TextExtractor: Send + Sync {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>>;
}

/// pdf-extract实现
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>> {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
            .map_err(|e| anyhow::anyhow!("PDF text extraction failed: {}", e))
    }
}

/// 校验URL协议为http/https
fn validate_url(url: &str) -> Result<(), StageError> {
    match reqwest::Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        _ => Err(StageError::InvalidInput(format!(
            "Invalid URL provided: {}",
            url
        ))),
    }
}

/// 从本地PDF文件提取纯文本
///
/// 逐页提取并以换行拼接，空页不计入；整篇无文本时返回Warning哨兵
/// （处理成功但内容不可用），与提取失败的Error相区分。
pub async fn extract_text(path: &Path, extractor: &dyn TextExtractor) -> TextOutcome {
    if !path.exists() {
        return TextOutcome::Error(format!("PDF file not found at path: {}", path.display()));
    }
    if !path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
    {
        return TextOutcome::Error(format!(
            "File does not appear to be a PDF: {}",
            path.display()
        ));
    }

    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return TextOutcome::Error(format!(
                "Failed to read PDF file {}: {}",
                path.display(),
                e
            ));
        }
    };

    let pages = match extractor.extract_pages(&bytes) {
        Ok(pages) => pages,
        Err(e) => {
            return TextOutcome::Error(format!(
                "Failed to extract text from PDF {}: {}",
                path.display(),
                e
            ));
        }
    };

    let mut text = String::new();
    for page_text in pages {
        if !page_text.trim().is_empty() {
            text.push_str(&page_text);
            text.push('\n');
        }
    }

    if text.is_empty() {
        return TextOutcome::Warning(format!(
            "No text could be extracted from PDF: {}. File might be image-based.",
            path.display()
        ));
    }

    TextOutcome::Ok(text)
}

/// 组合操作：经缓存下载报告并提取文本
///
/// 任何一步的失败都折算为该公司的哨兵结果。
pub async fn retrieve_and_extract(
    url: &str,
    cache: &DocumentCache,
    downloader: &ReportDownloader,
    extractor: &dyn TextExtractor,
) -> TextOutcome {
    let path = match cache
        .get_or_fetch(url, |target| async move { downloader.download(&target).await })
        .await
    {
        Ok(path) => path,
        Err(e) => return TextOutcome::Error(format!("Download failed: {}", e)),
    };

    extract_text(&path, extractor).await
}

// Include tests
#[cfg(test)]
mod tests;
