use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

use crate::agent::{AgentLoop, AgentOutcome};
use crate::cache::{DocumentCache, SummaryCache};
use crate::config::Config;
use crate::llm::CompletionService;
use crate::pipeline::{PipelineContext, WorkflowEngine, WorkflowInput};
use crate::retrieval::{FetchedBody, HttpTransport, ReportDownloader, TextExtractor};
use crate::search::SearchService;
use crate::summarize::Summarizer;
use crate::types::{ChatMessage, RequestKind, StageError, SummaryOutcome, TextOutcome, UrlOutcome};

// --- Mock collaborators ---

type ScriptFn = Box<dyn Fn(&str) -> Result<String> + Send + Sync>;

struct ScriptedCompletion {
    script: ScriptFn,
    calls: AtomicUsize,
}

impl ScriptedCompletion {
    fn new(script: ScriptFn) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: AtomicUsize::new(0),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.script)(prompt)
    }
}

struct ScriptedSearch {
    script: ScriptFn,
    calls: AtomicUsize,
}

impl ScriptedSearch {
    fn new(script: ScriptFn) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl SearchService for ScriptedSearch {
    async fn search(&self, query: &str, _max_results: usize) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.script)(query)
    }
}

struct EchoAgent {
    calls: AtomicUsize,
}

impl EchoAgent {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AgentLoop for EchoAgent {
    async fn run(&self, query: &str, history: &[ChatMessage]) -> Result<AgentOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = format!("answer to: {}", query);
        let mut updated_history = history.to_vec();
        updated_history.push(ChatMessage::user(query));
        updated_history.push(ChatMessage::assistant(reply.clone()));
        Ok(AgentOutcome {
            final_text: reply,
            updated_history,
        })
    }
}

struct StaticTransport {
    body: Option<Vec<u8>>,
    calls: AtomicUsize,
}

impl StaticTransport {
    fn serving(body: &[u8]) -> Arc<Self> {
        Arc::new(Self {
            body: Some(body.to_vec()),
            calls: AtomicUsize::new(0),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            body: None,
            calls: AtomicUsize::new(0),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpTransport for StaticTransport {
    async fn get(&self, _url: &str) -> Result<FetchedBody, StageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.body {
            Some(bytes) => Ok(FetchedBody {
                bytes: bytes.clone(),
                content_type: Some("application/pdf".to_string()),
            }),
            None => Err(StageError::Transient("connection timed out".to_string())),
        }
    }
}

struct StaticExtractor {
    pages: Vec<String>,
}

impl TextExtractor for StaticExtractor {
    fn extract_pages(&self, _bytes: &[u8]) -> Result<Vec<String>> {
        Ok(self.pages.clone())
    }
}

// --- Harness ---

fn test_config(temp: &TempDir) -> Config {
    let mut config = Config::default();
    config.internal_path = temp.path().to_path_buf();
    config.cache.document_cache_dir = temp.path().join("pdf_cache");
    config.cache.summary_cache_dir = temp.path().join("summary_cache");
    config.history.db_path = temp.path().join("analysis_history.db");
    config.fetch.retry_delay_secs = 0;
    config.search.retry_delay_secs = 0;
    config.summarize.chunk_size = 400;
    config.summarize.chunk_overlap = 40;
    config.summarize.combine_input_budget = 2000;
    config
}

fn build_engine(
    config: Config,
    completion: Arc<dyn CompletionService>,
    search: Arc<dyn SearchService>,
    agent: Arc<dyn AgentLoop>,
    transport: Arc<dyn HttpTransport>,
    extractor: Arc<dyn TextExtractor>,
) -> WorkflowEngine {
    let documents = Arc::new(DocumentCache::new(&config.cache.document_cache_dir));
    let summaries = Arc::new(SummaryCache::new(&config.cache.summary_cache_dir));
    let downloader = Arc::new(ReportDownloader::new(transport, config.fetch.clone()));
    let summarizer = Arc::new(Summarizer::new(
        completion.clone(),
        summaries,
        config.summarize.clone(),
    ));

    WorkflowEngine::new(PipelineContext {
        completion,
        search,
        agent,
        documents,
        downloader,
        extractor,
        summarizer,
        config,
    })
}

/// 正常对答的补全脚本：识别→两家公司，摘要与综合给出固定文本
fn happy_completion() -> Arc<ScriptedCompletion> {
    ScriptedCompletion::new(Box::new(|prompt| {
        if prompt.contains("comma-separated list") {
            Ok("CompanyA, CompanyB".to_string())
        } else if prompt.contains("SYNTHESIZED TRENDS") {
            Ok("Shared focus on emission cuts.".to_string())
        } else {
            Ok("per-chunk summary".to_string())
        }
    }))
}

// --- End-to-end scenarios ---

#[tokio::test]
async fn test_research_path_with_partial_url_discovery() {
    let temp = TempDir::new().unwrap();
    let completion = happy_completion();
    let search = ScriptedSearch::new(Box::new(|query| {
        if query.contains("CompanyA") {
            Ok("Search Results:\n\n1. Title: ESG\n   URL: https://example.com/companya-esg.pdf\n   Snippet: report".to_string())
        } else {
            Ok("No relevant search results found.".to_string())
        }
    }));
    let engine = build_engine(
        test_config(&temp),
        completion,
        search,
        EchoAgent::new(),
        StaticTransport::serving(b"%PDF-1.4"),
        Arc::new(StaticExtractor {
            pages: vec!["net zero by 2040".to_string()],
        }),
    );

    let state = engine
        .run(WorkflowInput::for_industry("automotive"))
        .await;

    assert_eq!(state.request_kind, RequestKind::IndustryAnalysis);
    assert_eq!(state.companies, vec!["CompanyA", "CompanyB"]);
    assert_eq!(
        state.report_urls["CompanyA"],
        UrlOutcome::Found("https://example.com/companya-esg.pdf".to_string())
    );
    assert_eq!(state.report_urls["CompanyB"], UrlOutcome::NotFound);

    // CompanyB never touches the network: its slot carries the sentinel
    assert!(state.extracted_texts["CompanyA"].is_usable());
    assert_eq!(
        state.extracted_texts["CompanyB"],
        TextOutcome::Error("No valid URL found.".to_string())
    );

    assert!(matches!(state.summaries["CompanyA"], SummaryOutcome::Ok(_)));
    assert!(matches!(
        state.summaries["CompanyB"],
        SummaryOutcome::Skipped(_)
    ));

    // Successful termination: only synthesis_result is populated
    let synthesis = state.synthesis_result.expect("synthesis present");
    assert!(synthesis.contains("Analysis based on reports processed for:"));
    assert!(synthesis.contains("- CompanyA: https://example.com/companya-esg.pdf"));
    assert!(synthesis.contains("--- Synthesized Trends ---"));
    assert!(state.error_message.is_none());
    assert!(state.agent_response.is_none());
}

#[tokio::test]
async fn test_download_failure_is_contained_per_company() {
    let temp = TempDir::new().unwrap();
    let completion = ScriptedCompletion::new(Box::new(|prompt| {
        if prompt.contains("comma-separated list") {
            Ok("CompanyA".to_string())
        } else {
            Ok("unused".to_string())
        }
    }));
    let search = ScriptedSearch::new(Box::new(|_| {
        Ok("1. Title: ESG\n   URL: https://example.com/companya-esg.pdf".to_string())
    }));
    let transport = StaticTransport::failing();
    let config = test_config(&temp);
    let document_cache_dir = config.cache.document_cache_dir.clone();
    let engine = build_engine(
        config,
        completion,
        search,
        EchoAgent::new(),
        transport.clone(),
        Arc::new(StaticExtractor { pages: vec![] }),
    );

    let state = engine
        .run(WorkflowInput::for_industry("automotive"))
        .await;

    // Three attempts were made, the sentinel names them, and no cache file exists
    assert_eq!(transport.call_count(), 3);
    assert!(matches!(
        &state.extracted_texts["CompanyA"],
        TextOutcome::Error(msg) if msg.contains("after 3 attempts")
    ));
    let cache = DocumentCache::new(&document_cache_dir);
    assert!(
        !cache
            .resolve_path("https://example.com/companya-esg.pdf")
            .exists()
    );

    // The lone company failed, so no summary survives and the run fails
    assert_eq!(
        state.error_message.as_deref(),
        Some("Analysis failed: No valid summaries could be generated.")
    );
    assert!(state.synthesis_result.is_none());
}

#[tokio::test]
async fn test_all_summaries_failed_aborts_pipeline() {
    let temp = TempDir::new().unwrap();
    // 识别成功，map阶段全部失败
    let completion = ScriptedCompletion::new(Box::new(|prompt| {
        if prompt.contains("comma-separated list") {
            Ok("CompanyA, CompanyB".to_string())
        } else {
            Err(anyhow::anyhow!("summarizer backend down"))
        }
    }));
    let search = ScriptedSearch::new(Box::new(|query| {
        let slug = if query.contains("CompanyA") { "a" } else { "b" };
        Ok(format!("URL: https://example.com/{}.pdf", slug))
    }));
    let engine = build_engine(
        test_config(&temp),
        completion,
        search,
        EchoAgent::new(),
        StaticTransport::serving(b"%PDF-1.4"),
        Arc::new(StaticExtractor {
            pages: vec!["usable text".to_string()],
        }),
    );

    let state = engine
        .run(WorkflowInput::for_industry("automotive"))
        .await;

    assert!(state
        .summaries
        .values()
        .all(|s| matches!(s, SummaryOutcome::Error(_))));
    assert_eq!(
        state.error_message.as_deref(),
        Some("Analysis failed: No valid summaries could be generated.")
    );
    assert!(state.synthesis_result.is_none());
}

#[tokio::test]
async fn test_empty_company_list_is_pipeline_failure() {
    let temp = TempDir::new().unwrap();
    let completion = ScriptedCompletion::new(Box::new(|_| Ok("  ,  ".to_string())));
    let search = ScriptedSearch::new(Box::new(|_| Ok("unused".to_string())));
    let engine = build_engine(
        test_config(&temp),
        completion,
        search.clone(),
        EchoAgent::new(),
        StaticTransport::serving(b"%PDF-1.4"),
        Arc::new(StaticExtractor { pages: vec![] }),
    );

    let state = engine
        .run(WorkflowInput::for_industry("automotive"))
        .await;

    assert_eq!(
        state.error_message.as_deref(),
        Some("Could not identify companies for industry 'automotive'.")
    );
    // The failure short-circuits every later stage
    assert_eq!(search.calls.load(Ordering::SeqCst), 0);
    assert!(state.report_urls.is_empty());
    assert!(state.synthesis_result.is_none());
}

#[tokio::test]
async fn test_basic_agent_path() {
    let temp = TempDir::new().unwrap();
    let completion = ScriptedCompletion::new(Box::new(|_| Ok("unused".to_string())));
    let agent = EchoAgent::new();
    let engine = build_engine(
        test_config(&temp),
        completion.clone(),
        ScriptedSearch::new(Box::new(|_| Ok("unused".to_string()))),
        agent.clone(),
        StaticTransport::serving(b"%PDF-1.4"),
        Arc::new(StaticExtractor { pages: vec![] }),
    );

    let history = vec![ChatMessage::user("earlier question")];
    let state = engine
        .run(WorkflowInput::for_query("what is a scope 3 emission?", history))
        .await;

    assert_eq!(state.request_kind, RequestKind::AgentQuery);
    assert_eq!(agent.call_count(), 1);
    assert_eq!(
        state.agent_response.as_deref(),
        Some("answer to: what is a scope 3 emission?")
    );
    // History accumulates the new exchange on top of the old one
    assert_eq!(state.messages.len(), 3);
    assert!(state.error_message.is_none());
    assert!(state.synthesis_result.is_none());
    // The pipeline completion service is never consulted on this path
    assert_eq!(completion.call_count(), 0);
}

#[tokio::test]
async fn test_no_input_routes_to_error() {
    let temp = TempDir::new().unwrap();
    let completion = ScriptedCompletion::new(Box::new(|_| Ok("unused".to_string())));
    let agent = EchoAgent::new();
    let engine = build_engine(
        test_config(&temp),
        completion.clone(),
        ScriptedSearch::new(Box::new(|_| Ok("unused".to_string()))),
        agent.clone(),
        StaticTransport::serving(b"%PDF-1.4"),
        Arc::new(StaticExtractor { pages: vec![] }),
    );

    let state = engine.run(WorkflowInput::default()).await;

    // Neither the agent nor the research path ever runs
    assert_eq!(agent.call_count(), 0);
    assert_eq!(completion.call_count(), 0);
    assert!(state.companies.is_empty());
    let error = state.error_message.expect("descriptive error");
    assert!(error.contains("No valid input found"));
}

#[tokio::test]
async fn test_industry_takes_precedence_over_query() {
    let temp = TempDir::new().unwrap();
    let agent = EchoAgent::new();
    let engine = build_engine(
        test_config(&temp),
        happy_completion(),
        ScriptedSearch::new(Box::new(|_| Ok("URL: https://example.com/a.pdf".to_string()))),
        agent.clone(),
        StaticTransport::serving(b"%PDF-1.4"),
        Arc::new(StaticExtractor {
            pages: vec!["text".to_string()],
        }),
    );

    let input = WorkflowInput {
        input_query: Some("also a question".to_string()),
        industry: Some("automotive".to_string()),
        messages: Vec::new(),
    };
    let state = engine.run(input).await;

    assert_eq!(agent.call_count(), 0);
    assert!(state.synthesis_result.is_some());
}

#[tokio::test]
async fn test_recursion_limit_aborts_run() {
    let temp = TempDir::new().unwrap();
    let mut config = test_config(&temp);
    config.workflow.recursion_limit = 0;

    let engine = build_engine(
        config,
        happy_completion(),
        ScriptedSearch::new(Box::new(|_| Ok("unused".to_string()))),
        EchoAgent::new(),
        StaticTransport::serving(b"%PDF-1.4"),
        Arc::new(StaticExtractor { pages: vec![] }),
    );

    let state = engine
        .run(WorkflowInput::for_industry("automotive"))
        .await;

    let error = state.error_message.expect("limit error");
    assert!(error.contains("limit"));
    assert!(state.synthesis_result.is_none());
}
