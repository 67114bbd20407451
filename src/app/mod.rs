//! 应用装配与运行入口
//!
//! 所有协作方实例（LLM客户端、搜索、下载、提取、缓存、历史库）在这里
//! 构造并注入引擎与编排器，生命周期归进程入口所有。

use anyhow::{Context, Result};
use regex::Regex;
use std::path::Path;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::agent::{AgentLoop, ResearchAgent};
use crate::cache::{DocumentCache, SummaryCache};
use crate::config::Config;
use crate::history::{TaskHistoryStore, TaskStatus};
use crate::llm::CompletionService;
use crate::llm::client::LLMClient;
use crate::llm::tools::{
    AgentToolDownloadReport, AgentToolExtractText, AgentToolQueryHistory, AgentToolWebSearch,
    PresetTools,
};
use crate::orchestrator::TaskOrchestrator;
use crate::pipeline::{PipelineContext, WorkflowEngine, WorkflowInput, WorkflowState};
use crate::retrieval::{self, PdfTextExtractor, ReportDownloader, ReqwestTransport, TextExtractor};
use crate::search::{DuckDuckGoSearch, SearchService};
use crate::summarize::Summarizer;
use crate::types::ChatMessage;

const MAIN_SYSTEM_PROMPT: &str =
    "You are an expert analyst of corporate sustainability. Follow the user's instructions exactly.";

const SUMMARY_SYSTEM_PROMPT: &str =
    "You are a summarization engine for corporate sustainability reports. Be factual and concise.";

/// 轮询后台任务状态的间隔
const POLL_INTERVAL: Duration = Duration::from_secs(2);

static ANALYZE_COMMAND_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^analyze\s+industry\s+(.+)$").expect("invalid analyze command pattern")
});

/// 运行模式
#[derive(Debug, Clone)]
pub enum RunMode {
    /// 交互式会话
    Interactive,
    /// 一次性行业分析
    Industry(String),
    /// 一次性自由问答
    Query(String),
    /// 单份报告的下载与摘要
    SingleReport(String),
}

/// 装配完成的应用
pub struct App {
    llm: LLMClient,
    engine: Arc<WorkflowEngine>,
    orchestrator: TaskOrchestrator,
    config: Config,
}

/// 启动入口
pub async fn launch(config: &Config, mode: RunMode) -> Result<()> {
    let app = App::new(config.clone())?;

    match mode {
        RunMode::Industry(industry) => app.run_analysis(&industry).await,
        RunMode::Query(query) => {
            let state = app
                .engine
                .run(WorkflowInput::for_query(query, Vec::new()))
                .await;
            print_outcome(&state);
            Ok(())
        }
        RunMode::SingleReport(url) => app.run_single_report(&url).await,
        RunMode::Interactive => app.run_interactive().await,
    }
}

impl App {
    /// 构造全部协作方并装配引擎与编排器
    pub fn new(config: Config) -> Result<Self> {
        std::fs::create_dir_all(&config.internal_path)
            .context("Failed to create internal work directory")?;

        let llm = LLMClient::new(config.clone())?;
        let completion: Arc<dyn CompletionService> =
            Arc::new(llm.main_endpoint(MAIN_SYSTEM_PROMPT));
        let summary_completion: Arc<dyn CompletionService> =
            Arc::new(llm.summary_endpoint(SUMMARY_SYSTEM_PROMPT));

        let search: Arc<dyn SearchService> =
            Arc::new(DuckDuckGoSearch::new(config.fetch.timeout_seconds)?);
        let documents = Arc::new(
            DocumentCache::new(&config.cache.document_cache_dir)
                .with_enabled(config.cache.enabled),
        );
        let summaries = Arc::new(
            SummaryCache::new(&config.cache.summary_cache_dir).with_enabled(config.cache.enabled),
        );
        let transport = Arc::new(ReqwestTransport::new(config.fetch.timeout_seconds)?);
        let downloader = Arc::new(ReportDownloader::new(transport, config.fetch.clone()));
        let extractor: Arc<dyn TextExtractor> = Arc::new(PdfTextExtractor);
        let summarizer = Arc::new(Summarizer::new(
            summary_completion,
            summaries,
            config.summarize.clone(),
        ));
        let history = Arc::new(
            TaskHistoryStore::open(&config.history.db_path)
                .context("Failed to open task history store")?,
        );

        let tools = PresetTools {
            search: AgentToolWebSearch::new(search.clone(), config.search.max_results),
            download: AgentToolDownloadReport::new(documents.clone(), downloader.clone()),
            extract: AgentToolExtractText::new(extractor.clone()),
            history: AgentToolQueryHistory::new(history.clone()),
        };
        let agent: Arc<dyn AgentLoop> =
            Arc::new(ResearchAgent::new(llm.clone(), tools, config.clone()));

        let engine = Arc::new(WorkflowEngine::new(PipelineContext {
            completion,
            search,
            agent,
            documents,
            downloader,
            extractor,
            summarizer,
            config: config.clone(),
        }));
        let orchestrator = TaskOrchestrator::new(engine.clone(), history);

        Ok(Self {
            llm,
            engine,
            orchestrator,
            config,
        })
    }

    /// 提交行业分析并轮询到终态
    async fn run_analysis(&self, industry: &str) -> Result<()> {
        let task_id = self.orchestrator.submit(industry)?;

        loop {
            tokio::time::sleep(POLL_INTERVAL).await;
            let Some(record) = self.orchestrator.get_status(&task_id)? else {
                anyhow::bail!("Analysis task {} disappeared from the history store", task_id);
            };

            match record.status {
                TaskStatus::Pending | TaskStatus::Running => {
                    println!("⏳ 任务 {} 状态: {}", task_id, record.status);
                }
                status => {
                    println!("\n--- 分析结束 (状态: {}) ---", status);
                    if let Some(summary) = record.result_summary {
                        println!("{}", summary);
                    }
                    return Ok(());
                }
            }
        }
    }

    /// 单份报告：经缓存下载、提取并摘要
    async fn run_single_report(&self, url: &str) -> Result<()> {
        let context = self.engine.context();
        let entity = entity_from_url(url);
        println!("📄 单报告分析: {} ({})", url, entity);

        let text = retrieval::retrieve_and_extract(
            url,
            &context.documents,
            &context.downloader,
            context.extractor.as_ref(),
        )
        .await;
        let outcome = context.summarizer.summarize(&entity, &text).await;

        match outcome {
            crate::types::SummaryOutcome::Ok(summary) => {
                println!("\n--- 报告摘要 ---\n{}", summary);
                Ok(())
            }
            crate::types::SummaryOutcome::Skipped(reason)
            | crate::types::SummaryOutcome::Error(reason) => {
                anyhow::bail!("Report analysis failed: {}", reason)
            }
        }
    }

    /// 交互式会话循环
    async fn run_interactive(&self) -> Result<()> {
        println!("--- EcoLens 检索与分析Agent ---");
        println!("主模型: {}", self.config.llm.model_main);
        println!("摘要模型: {}", self.config.llm.model_summary);
        println!("输入问题直接问答；输入 'analyze industry <行业名>' 运行报告分析。");
        println!("输入 'quit' 或 'exit' 退出。");

        // 启动时检查模型连接
        self.llm.check_connection().await?;

        let mut messages: Vec<ChatMessage> = Vec::new();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            println!("\nUser Query:");
            let Some(line) = lines.next_line().await? else {
                break;
            };
            let input = line.trim();

            if input.is_empty() {
                continue;
            }
            if matches!(input.to_lowercase().as_str(), "quit" | "exit") {
                println!("再见。");
                break;
            }

            if let Some(captures) = ANALYZE_COMMAND_RE.captures(input) {
                let industry = captures[1].trim().to_string();
                if let Err(e) = self.run_analysis(&industry).await {
                    eprintln!("❌ 分析执行出错: {}", e);
                }
                continue;
            }

            let state = self
                .engine
                .run(WorkflowInput::for_query(input, messages.clone()))
                .await;
            // 问答路径的历史跨轮累积
            messages = state.messages.clone();
            print_outcome(&state);
        }

        Ok(())
    }
}

/// 打印一次工作流执行的最终结果
fn print_outcome(state: &WorkflowState) {
    if let Some(error) = &state.error_message {
        eprintln!("\nError: {}", error);
    } else if let Some(response) = &state.agent_response {
        println!("\nAgent Response:\n{}", response);
    } else if let Some(synthesis) = &state.synthesis_result {
        println!("\nAnalysis Result:\n{}", synthesis);
    } else {
        println!("\n工作流结束，但没有产生标准输出。");
    }
}

/// 从URL推导摘要缓存用的实体名
fn entity_from_url(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|parsed| {
            Path::new(parsed.path())
                .file_stem()
                .map(|stem| stem.to_string_lossy().to_string())
        })
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "report".to_string())
}
