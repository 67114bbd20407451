//! 报告摘要节点

use crate::pipeline::context::PipelineContext;
use crate::pipeline::state::WorkflowState;
use crate::types::SummaryOutcome;
use crate::utils::threads::run_parallel;

pub async fn run(state: &mut WorkflowState, ctx: &PipelineContext) {
    println!("--- 节点: summarize_reports ---");
    if state.has_failed() {
        return;
    }
    if state.extracted_texts.is_empty() {
        println!("   ⚠️ 状态中没有提取文本，跳过摘要");
        return;
    }

    println!(
        "   🚀 并发摘要{}家公司，最大并发数: {}",
        state.extracted_texts.len(),
        ctx.config.workflow.max_parallels
    );

    let summarizer = ctx.summarizer.clone();
    let results = run_parallel(
        state.extracted_texts.clone(),
        ctx.config.workflow.max_parallels,
        move |company, text| {
            let summarizer = summarizer.clone();
            async move { Ok(summarizer.summarize(&company, &text).await) }
        },
    )
    .await;

    for (company, result) in results {
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => SummaryOutcome::Error(format!(
                "Error retrieving summarization result: {}",
                e
            )),
        };
        state.summaries.insert(company, outcome);
    }

    println!(
        "   ✅ 摘要完成: {}",
        state.summaries.keys().cloned().collect::<Vec<_>>().join(", ")
    );
}
