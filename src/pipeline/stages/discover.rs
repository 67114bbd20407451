//! 报告URL检索节点

use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

use crate::pipeline::context::PipelineContext;
use crate::pipeline::state::WorkflowState;
use crate::types::UrlOutcome;

static PDF_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)https?://\S+\.pdf").expect("invalid pdf url pattern"));

pub async fn run(state: &mut WorkflowState, ctx: &PipelineContext) {
    println!("--- 节点: search_for_reports ---");
    if state.has_failed() {
        return;
    }

    let companies = state.companies.clone();
    println!("   🔍 为{}家公司检索报告URL...", companies.len());

    for company in companies {
        // 已有URL或"确认没有"的公司跳过，仅搜索失败的条目才重试
        if let Some(existing) = state.report_urls.get(&company)
            && !matches!(existing, UrlOutcome::Error(_))
        {
            println!("   ⏭️ {} 已有检索结果，跳过搜索", company);
            continue;
        }

        let outcome = search_report_url(&company, ctx).await;
        match &outcome {
            UrlOutcome::Found(url) => println!("   ✅ {} 的报告URL: {}", company, url),
            UrlOutcome::NotFound => println!("   ⚠️ 未找到 {} 的报告PDF链接", company),
            UrlOutcome::Error(e) => eprintln!("   ❌ {} 的搜索失败: {}", company, e),
        }
        state.report_urls.insert(company, outcome);
    }
}

/// 搜索单个公司的报告URL，搜索失败时按固定间隔重试
///
/// "搜到了但没有PDF链接"也会重试到上限，只是重试之间不等待。
async fn search_report_url(company: &str, ctx: &PipelineContext) -> UrlOutcome {
    let query = format!("{} sustainability report filetype:pdf", company);
    let attempts = ctx.config.search.retry_attempts.max(1);

    for attempt in 1..=attempts {
        match ctx
            .search
            .search(&query, ctx.config.search.max_results)
            .await
        {
            Ok(results) => {
                if let Some(found) = PDF_URL_RE.find(&results) {
                    return UrlOutcome::Found(found.as_str().to_string());
                }
            }
            Err(e) => {
                eprintln!(
                    "   ❌ {} 的搜索尝试失败 (第 {} / {} 次): {}",
                    company, attempt, attempts, e
                );
                if attempt == attempts {
                    return UrlOutcome::Error(format!(
                        "Error during search for {} after retries: {}",
                        company, e
                    ));
                }
                tokio::time::sleep(Duration::from_secs(ctx.config.search.retry_delay_secs)).await;
            }
        }
    }

    UrlOutcome::NotFound
}
