//! 趋势综合节点

use crate::pipeline::context::PipelineContext;
use crate::pipeline::state::WorkflowState;

const SYNTHESIS_PROMPT: &str = "You are an analyst reviewing corporate sustainability reports from the {industry} industry. \
Based on the following per-company summaries, identify the common themes, notable differences and emerging trends \
across the companies. Provide a structured synthesis.\n\n{combined_summaries}\n\nSYNTHESIZED TRENDS:";

pub async fn run(state: &mut WorkflowState, ctx: &PipelineContext) {
    println!("--- 节点: synthesize_trends ---");
    if state.has_failed() {
        return;
    }

    let industry = state.industry.clone().unwrap_or_default();

    // 只有可用摘要参与综合，Error/Skipped被过滤
    let valid_summaries: Vec<(&String, &str)> = state
        .summaries
        .iter()
        .filter_map(|(company, outcome)| outcome.text().map(|text| (company, text)))
        .filter(|(_, text)| !text.trim().is_empty())
        .collect();

    if valid_summaries.is_empty() {
        eprintln!("   ⚠️ 没有可用于综合的有效摘要");
        state.fail("Analysis failed: No valid summaries could be generated.");
        return;
    }

    println!("   🧪 基于{}份摘要综合趋势...", valid_summaries.len());
    let combined_summaries = valid_summaries
        .iter()
        .map(|(company, summary)| format!("--- Summary for {} ---\n{}", company, summary))
        .collect::<Vec<_>>()
        .join("\n\n");

    let prompt = SYNTHESIS_PROMPT
        .replace("{industry}", &industry)
        .replace("{combined_summaries}", &combined_summaries);

    match ctx.completion.complete(&prompt).await {
        Ok(synthesis) => {
            // 结果头部带上来源公司与报告URL，保证可追溯
            let report_list = valid_summaries
                .iter()
                .map(|(company, _)| {
                    let url = state
                        .report_urls
                        .get(*company)
                        .and_then(|outcome| outcome.url())
                        .unwrap_or("URL not found/processed");
                    format!("- {}: {}", company, url)
                })
                .collect::<Vec<_>>()
                .join("\n");

            state.synthesis_result = Some(format!(
                "Analysis based on reports processed for:\n{}\n\n--- Synthesized Trends ---\n{}",
                report_list, synthesis
            ));
            println!("   ✅ 趋势综合完成");
        }
        Err(e) => {
            state.fail(format!("Failed during the final synthesis step: {}", e));
        }
    }
}
