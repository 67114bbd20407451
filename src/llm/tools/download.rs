//! 报告下载工具

use rig::tool::Tool;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::ResearchToolError;
use crate::cache::DocumentCache;
use crate::retrieval::ReportDownloader;

/// 报告下载工具，命中文档缓存时不发起网络请求
#[derive(Clone)]
pub struct AgentToolDownloadReport {
    cache: Arc<DocumentCache>,
    downloader: Arc<ReportDownloader>,
}

/// 下载参数
#[derive(Debug, Deserialize)]
pub struct DownloadReportArgs {
    pub url: String,
}

/// 下载结果
#[derive(Debug, Serialize)]
pub struct DownloadReportResult {
    pub local_path: String,
}

impl AgentToolDownloadReport {
    pub fn new(cache: Arc<DocumentCache>, downloader: Arc<ReportDownloader>) -> Self {
        Self { cache, downloader }
    }
}

impl Tool for AgentToolDownloadReport {
    const NAME: &'static str = "download_report";

    type Error = ResearchToolError;
    type Args = DownloadReportArgs;
    type Output = DownloadReportResult;

    async fn definition(&self, _prompt: String) -> rig::completion::ToolDefinition {
        rig::completion::ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Downloads a PDF report from a URL into the local cache and returns the local file path. Checks the cache first. Input MUST be a valid http/https URL pointing at a PDF.".to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "url": {
                        "type": "string",
                        "description": "The URL of the PDF report to download."
                    }
                },
                "required": ["url"]
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        println!("   🔧 tool called...download_report@{}", args.url);

        let downloader = self.downloader.clone();
        let path = self
            .cache
            .get_or_fetch(&args.url, |url| async move { downloader.download(&url).await })
            .await
            .map_err(|e| ResearchToolError(format!("Failed to download report: {}", e)))?;

        Ok(DownloadReportResult {
            local_path: path.to_string_lossy().to_string(),
        })
    }
}
