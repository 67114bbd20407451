//! 公司识别节点

use std::collections::HashSet;

use crate::pipeline::context::PipelineContext;
use crate::pipeline::state::WorkflowState;

const COMPANY_ID_PROMPT: &str = "List the key public companies in the {industry} industry that are known to publish \
corporate sustainability reports. Respond with ONLY a comma-separated list of company names, nothing else.";

pub async fn run(state: &mut WorkflowState, ctx: &PipelineContext) {
    println!("--- 节点: identify_companies ---");
    if state.has_failed() {
        return;
    }

    let Some(industry) = state.industry.clone() else {
        state.fail("No industry provided for company identification.");
        return;
    };
    println!("   🏭 为行业 '{}' 识别公司...", industry);

    let prompt = COMPANY_ID_PROMPT.replace("{industry}", &industry);
    match ctx.completion.complete(&prompt).await {
        Ok(response) => {
            let companies = parse_company_list(&response);
            if companies.is_empty() {
                eprintln!(
                    "   ⚠️ 模型未能识别出公司，原始响应: {}",
                    response.trim()
                );
                // 空列表是管线级失败，不能当作静默的空结果继续
                state.fail(format!(
                    "Could not identify companies for industry '{}'.",
                    industry
                ));
                return;
            }

            println!("   ✅ 识别出{}家公司: {}", companies.len(), companies.join(", "));
            state.companies = companies;
        }
        Err(e) => {
            state.fail(format!("Failed to identify companies: {}", e));
        }
    }
}

/// 解析逗号分隔的公司列表，保序去重
fn parse_company_list(response: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    response
        .split(',')
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty() && seen.insert(name.clone()))
        .collect()
}
