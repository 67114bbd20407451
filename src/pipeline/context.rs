//! 管线上下文 - 显式注入的协作方集合
//!
//! 所有外部协作方（补全服务、搜索、下载、提取、缓存、摘要器、Agent循环）
//! 都由进程入口构造后注入，引擎自身不持有任何全局单例。

use std::sync::Arc;

use crate::agent::AgentLoop;
use crate::cache::DocumentCache;
use crate::config::Config;
use crate::llm::CompletionService;
use crate::retrieval::{ReportDownloader, TextExtractor};
use crate::search::SearchService;
use crate::summarize::Summarizer;

/// 管线上下文
#[derive(Clone)]
pub struct PipelineContext {
    /// 主模型补全服务，用于公司识别与趋势综合
    pub completion: Arc<dyn CompletionService>,

    /// 搜索服务
    pub search: Arc<dyn SearchService>,

    /// 基础Agent循环
    pub agent: Arc<dyn AgentLoop>,

    /// 报告文档缓存
    pub documents: Arc<DocumentCache>,

    /// 报告下载器
    pub downloader: Arc<ReportDownloader>,

    /// PDF文本提取器
    pub extractor: Arc<dyn TextExtractor>,

    /// 摘要器
    pub summarizer: Arc<Summarizer>,

    /// 配置
    pub config: Config,
}
