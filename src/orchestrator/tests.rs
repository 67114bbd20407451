use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use super::*;
use crate::agent::{AgentLoop, AgentOutcome};
use crate::cache::{DocumentCache, SummaryCache};
use crate::config::Config;
use crate::llm::CompletionService;
use crate::pipeline::PipelineContext;
use crate::retrieval::{FetchedBody, HttpTransport, ReportDownloader, TextExtractor};
use crate::search::SearchService;
use crate::summarize::Summarizer;
use crate::types::{ChatMessage, StageError};

struct FixedCompletion {
    companies: String,
}

#[async_trait]
impl CompletionService for FixedCompletion {
    async fn complete(&self, prompt: &str) -> Result<String> {
        if prompt.contains("comma-separated list") {
            Ok(self.companies.clone())
        } else if prompt.contains("SYNTHESIZED TRENDS") {
            Ok("trend synthesis".to_string())
        } else {
            Ok("chunk summary".to_string())
        }
    }
}

struct FixedSearch;

#[async_trait]
impl SearchService for FixedSearch {
    async fn search(&self, _query: &str, _max_results: usize) -> Result<String> {
        Ok("URL: https://example.com/report.pdf".to_string())
    }
}

struct NoopAgent;

#[async_trait]
impl AgentLoop for NoopAgent {
    async fn run(&self, _query: &str, history: &[ChatMessage]) -> Result<AgentOutcome> {
        Ok(AgentOutcome {
            final_text: "noop".to_string(),
            updated_history: history.to_vec(),
        })
    }
}

struct PdfTransport;

#[async_trait]
impl HttpTransport for PdfTransport {
    async fn get(&self, _url: &str) -> Result<FetchedBody, StageError> {
        Ok(FetchedBody {
            bytes: b"%PDF-1.4".to_vec(),
            content_type: Some("application/pdf".to_string()),
        })
    }
}

struct TextPages;

impl TextExtractor for TextPages {
    fn extract_pages(&self, _bytes: &[u8]) -> Result<Vec<String>> {
        Ok(vec!["renewables up 20%".to_string()])
    }
}

fn build_orchestrator(temp: &TempDir, companies: &str) -> TaskOrchestrator {
    let mut config = Config::default();
    config.internal_path = temp.path().to_path_buf();
    config.cache.document_cache_dir = temp.path().join("pdf_cache");
    config.cache.summary_cache_dir = temp.path().join("summary_cache");
    config.history.db_path = temp.path().join("analysis_history.db");
    config.fetch.retry_delay_secs = 0;
    config.search.retry_delay_secs = 0;

    let completion: Arc<dyn CompletionService> = Arc::new(FixedCompletion {
        companies: companies.to_string(),
    });
    let documents = Arc::new(DocumentCache::new(&config.cache.document_cache_dir));
    let summaries = Arc::new(SummaryCache::new(&config.cache.summary_cache_dir));
    let downloader = Arc::new(ReportDownloader::new(
        Arc::new(PdfTransport),
        config.fetch.clone(),
    ));
    let summarizer = Arc::new(Summarizer::new(
        completion.clone(),
        summaries,
        config.summarize.clone(),
    ));

    let engine = Arc::new(crate::pipeline::WorkflowEngine::new(PipelineContext {
        completion,
        search: Arc::new(FixedSearch),
        agent: Arc::new(NoopAgent),
        documents,
        downloader,
        extractor: Arc::new(TextPages),
        summarizer,
        config,
    }));
    let history = Arc::new(TaskHistoryStore::open_in_memory().unwrap());

    TaskOrchestrator::new(engine, history)
}

async fn poll_until_terminal(orchestrator: &TaskOrchestrator, task_id: &str) -> TaskRecord {
    for _ in 0..200 {
        let record = orchestrator
            .get_status(task_id)
            .unwrap()
            .expect("task exists");
        match record.status {
            TaskStatus::Pending | TaskStatus::Running => {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            _ => return record,
        }
    }
    panic!("task {} never reached a terminal state", task_id);
}

#[tokio::test]
async fn test_submit_returns_immediately_with_pending_record() {
    let temp = TempDir::new().unwrap();
    let orchestrator = build_orchestrator(&temp, "CompanyA");

    let task_id = orchestrator.submit("automotive").unwrap();

    let record = orchestrator.get_status(&task_id).unwrap().unwrap();
    assert_eq!(record.industry, "automotive");
    // The record exists right away, whatever state the background task is in
    assert!(matches!(
        record.status,
        TaskStatus::Pending | TaskStatus::Running | TaskStatus::Completed
    ));
}

#[tokio::test]
async fn test_successful_analysis_completes_with_result() {
    let temp = TempDir::new().unwrap();
    let orchestrator = build_orchestrator(&temp, "CompanyA, CompanyB");

    let task_id = orchestrator.submit("automotive").unwrap();
    let record = poll_until_terminal(&orchestrator, &task_id).await;

    assert_eq!(record.status, TaskStatus::Completed);
    let summary = record.result_summary.expect("result recorded");
    assert!(summary.contains("--- Synthesized Trends ---"));
    assert!(record.start_time.is_some());
    assert!(record.duration_seconds.is_some());
}

#[tokio::test]
async fn test_failed_analysis_records_error_text() {
    let temp = TempDir::new().unwrap();
    // 识别返回空列表 → 管线级失败
    let orchestrator = build_orchestrator(&temp, "   ");

    let task_id = orchestrator.submit("automotive").unwrap();
    let record = poll_until_terminal(&orchestrator, &task_id).await;

    assert_eq!(record.status, TaskStatus::Failed);
    assert!(
        record
            .result_summary
            .unwrap()
            .contains("Could not identify companies")
    );
}

#[tokio::test]
async fn test_unknown_task_id_is_none() {
    let temp = TempDir::new().unwrap();
    let orchestrator = build_orchestrator(&temp, "CompanyA");

    assert!(orchestrator.get_status("no-such-task").unwrap().is_none());
}

#[tokio::test]
async fn test_concurrent_submissions_are_independent() {
    let temp = TempDir::new().unwrap();
    let orchestrator = build_orchestrator(&temp, "CompanyA");

    let first = orchestrator.submit("automotive").unwrap();
    let second = orchestrator.submit("energy").unwrap();
    assert_ne!(first, second);

    let first_record = poll_until_terminal(&orchestrator, &first).await;
    let second_record = poll_until_terminal(&orchestrator, &second).await;

    assert_eq!(first_record.status, TaskStatus::Completed);
    assert_eq!(second_record.status, TaskStatus::Completed);
    assert_eq!(first_record.industry, "automotive");
    assert_eq!(second_record.industry, "energy");
}
