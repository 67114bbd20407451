//! 报告下载与文本提取节点

use std::collections::BTreeMap;

use crate::pipeline::context::PipelineContext;
use crate::pipeline::state::WorkflowState;
use crate::retrieval;
use crate::types::{TextOutcome, UrlOutcome};
use crate::utils::threads::run_parallel;

pub async fn run(state: &mut WorkflowState, ctx: &PipelineContext) {
    println!("--- 节点: download_and_extract ---");
    if state.has_failed() {
        return;
    }
    if state.report_urls.is_empty() {
        println!("   ⚠️ 状态中没有报告URL，跳过下载提取");
        return;
    }

    // 没有有效URL的公司直接记录哨兵，不发起任何网络请求
    let mut jobs: BTreeMap<String, String> = BTreeMap::new();
    for (company, outcome) in &state.report_urls {
        match outcome {
            UrlOutcome::Found(url) => {
                jobs.insert(company.clone(), url.clone());
            }
            UrlOutcome::NotFound | UrlOutcome::Error(_) => {
                state.extracted_texts.insert(
                    company.clone(),
                    TextOutcome::Error("No valid URL found.".to_string()),
                );
            }
        }
    }

    println!(
        "   🚀 并发下载提取{}份报告，最大并发数: {}",
        jobs.len(),
        ctx.config.workflow.max_parallels
    );

    let documents = ctx.documents.clone();
    let downloader = ctx.downloader.clone();
    let extractor = ctx.extractor.clone();
    let results = run_parallel(
        jobs,
        ctx.config.workflow.max_parallels,
        move |company, url| {
            let documents = documents.clone();
            let downloader = downloader.clone();
            let extractor = extractor.clone();
            async move {
                println!("   📄 处理 {} 的报告: {}", company, url);
                Ok(
                    retrieval::retrieve_and_extract(
                        &url,
                        &documents,
                        &downloader,
                        extractor.as_ref(),
                    )
                    .await,
                )
            }
        },
    )
    .await;

    for (company, result) in results {
        let outcome = match result {
            Ok(outcome) => outcome,
            // worker panic也只折算为该公司的错误
            Err(e) => TextOutcome::Error(format!("Error during download/extraction: {}", e)),
        };
        if let TextOutcome::Warning(reason) | TextOutcome::Error(reason) = &outcome {
            eprintln!("   ⚠️ {} 的下载/提取结果: {}", company, reason);
        }
        state.extracted_texts.insert(company, outcome);
    }

    println!("   ✅ 下载提取完成（个别公司可能单独失败）");
}
