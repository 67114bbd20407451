use super::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// 可编程的测试传输
struct MockTransport {
    calls: AtomicUsize,
    outcome: Box<dyn Fn(usize) -> Result<FetchedBody, StageError> + Send + Sync>,
}

impl MockTransport {
    fn failing(message: &'static str) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            outcome: Box::new(move |_| Err(StageError::Transient(message.to_string()))),
        }
    }

    fn succeeding(bytes: Vec<u8>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            outcome: Box::new(move |_| {
                Ok(FetchedBody {
                    bytes: bytes.clone(),
                    content_type: Some("application/pdf".to_string()),
                })
            }),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn get(&self, _url: &str) -> Result<FetchedBody, StageError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        (self.outcome)(n)
    }
}

struct FakeExtractor {
    pages: Vec<String>,
}

impl TextExtractor for FakeExtractor {
    fn extract_pages(&self, _bytes: &[u8]) -> anyhow::Result<Vec<String>> {
        Ok(self.pages.clone())
    }
}

fn fetch_config_without_delay() -> FetchConfig {
    FetchConfig {
        retry_attempts: 3,
        retry_delay_secs: 0,
        timeout_seconds: 5,
    }
}

#[tokio::test]
async fn test_download_rejects_invalid_scheme() {
    let transport = Arc::new(MockTransport::succeeding(vec![1, 2, 3]));
    let downloader = ReportDownloader::new(transport.clone(), fetch_config_without_delay());

    let result = downloader.download("ftp://example.com/report.pdf").await;

    // Fast failure without any network attempt
    assert!(matches!(result, Err(StageError::InvalidInput(_))));
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn test_download_retries_then_reports_attempts() {
    let transport = Arc::new(MockTransport::failing("connection timed out"));
    let downloader = ReportDownloader::new(transport.clone(), fetch_config_without_delay());

    let result = downloader.download("https://example.com/report.pdf").await;

    assert_eq!(transport.call_count(), 3);
    let error = result.unwrap_err();
    let message = error.to_string();
    assert!(message.contains("after 3 attempts"), "got: {}", message);
}

#[tokio::test]
async fn test_download_recovers_on_later_attempt() {
    let transport = Arc::new(MockTransport {
        calls: AtomicUsize::new(0),
        outcome: Box::new(|n| {
            if n < 2 {
                Err(StageError::Transient("reset".to_string()))
            } else {
                Ok(FetchedBody {
                    bytes: b"%PDF".to_vec(),
                    content_type: Some("application/pdf".to_string()),
                })
            }
        }),
    });
    let downloader = ReportDownloader::new(transport.clone(), fetch_config_without_delay());

    let result = downloader.download("https://example.com/report.pdf").await;

    assert_eq!(result.unwrap(), b"%PDF".to_vec());
    assert_eq!(transport.call_count(), 3);
}

#[tokio::test]
async fn test_extract_text_missing_file() {
    let extractor = FakeExtractor { pages: vec![] };
    let outcome = extract_text(Path::new("/nonexistent/report.pdf"), &extractor).await;

    assert!(matches!(outcome, TextOutcome::Error(msg) if msg.contains("not found")));
}

#[tokio::test]
async fn test_extract_text_rejects_non_pdf_extension() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("report.txt");
    std::fs::write(&path, b"plain text").unwrap();

    let extractor = FakeExtractor { pages: vec![] };
    let outcome = extract_text(&path, &extractor).await;

    assert!(matches!(outcome, TextOutcome::Error(msg) if msg.contains("does not appear to be a PDF")));
}

#[tokio::test]
async fn test_extract_text_joins_pages_with_newlines() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("report.pdf");
    std::fs::write(&path, b"%PDF-1.4").unwrap();

    let extractor = FakeExtractor {
        pages: vec![
            "page one".to_string(),
            "   ".to_string(),
            "page two".to_string(),
        ],
    };
    let outcome = extract_text(&path, &extractor).await;

    // Empty pages contribute nothing, non-empty pages are newline separated
    assert_eq!(outcome, TextOutcome::Ok("page one\npage two\n".to_string()));
}

#[tokio::test]
async fn test_extract_text_all_empty_pages_is_warning() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("scanned.pdf");
    std::fs::write(&path, b"%PDF-1.4").unwrap();

    let extractor = FakeExtractor {
        pages: vec!["".to_string(), "  \n ".to_string()],
    };
    let outcome = extract_text(&path, &extractor).await;

    // A Warning, never an Error: the document processed fine but is unusable
    assert!(matches!(outcome, TextOutcome::Warning(msg) if msg.contains("image-based")));
}

#[tokio::test]
async fn test_retrieve_and_extract_failure_leaves_no_cache_entry() {
    let temp_dir = TempDir::new().unwrap();
    let cache = DocumentCache::new(temp_dir.path());
    let transport = Arc::new(MockTransport::failing("connection timed out"));
    let downloader = ReportDownloader::new(transport, fetch_config_without_delay());
    let extractor = FakeExtractor { pages: vec![] };

    let url = "https://example.com/report.pdf";
    let outcome = retrieve_and_extract(url, &cache, &downloader, &extractor).await;

    assert!(matches!(outcome, TextOutcome::Error(msg) if msg.contains("after 3 attempts")));
    assert!(!cache.resolve_path(url).exists());
}

#[tokio::test]
async fn test_retrieve_and_extract_happy_path() {
    let temp_dir = TempDir::new().unwrap();
    let cache = DocumentCache::new(temp_dir.path());
    let transport = Arc::new(MockTransport::succeeding(b"%PDF-1.4".to_vec()));
    let downloader = ReportDownloader::new(transport, fetch_config_without_delay());
    let extractor = FakeExtractor {
        pages: vec!["emissions fell 12%".to_string()],
    };

    let url = "https://example.com/report.pdf";
    let outcome = retrieve_and_extract(url, &cache, &downloader, &extractor).await;

    assert!(outcome.is_usable());
    assert!(cache.resolve_path(url).exists());
}
