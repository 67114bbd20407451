//! 分析历史查询工具

use rig::tool::Tool;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::ResearchToolError;
use crate::history::TaskHistoryStore;

const DEFAULT_LIMIT: usize = 5;

/// 历史查询工具，检索已完成的行业分析任务
#[derive(Clone)]
pub struct AgentToolQueryHistory {
    history: Arc<TaskHistoryStore>,
}

/// 查询参数，缺省或非法时回落到默认值
#[derive(Debug, Deserialize)]
pub struct QueryHistoryArgs {
    pub limit: Option<usize>,
    pub industry_filter: Option<String>,
}

/// 查询结果
#[derive(Debug, Serialize)]
pub struct QueryHistoryResult {
    pub report: String,
}

impl AgentToolQueryHistory {
    pub fn new(history: Arc<TaskHistoryStore>) -> Self {
        Self { history }
    }
}

impl Tool for AgentToolQueryHistory {
    const NAME: &'static str = "query_analysis_history";

    type Error = ResearchToolError;
    type Args = QueryHistoryArgs;
    type Output = QueryHistoryResult;

    async fn definition(&self, _prompt: String) -> rig::completion::ToolDefinition {
        rig::completion::ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Queries the history of successfully completed sustainability analysis tasks, returning the full summary for each. Use it to answer questions about past analyses, like listing the last N tasks or finding tasks for a specific industry. 'limit' defaults to 5.".to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of recent COMPLETED tasks to retrieve (default 5)."
                    },
                    "industry_filter": {
                        "type": "string",
                        "description": "Filter COMPLETED tasks by industry name (case-insensitive)."
                    }
                },
                "required": []
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        let limit = args.limit.unwrap_or(DEFAULT_LIMIT);
        let industry_filter = args.industry_filter.as_deref();
        println!(
            "   🔧 tool called...query_analysis_history@limit={} industry={:?}",
            limit, industry_filter
        );

        let tasks = self
            .history
            .query_completed(limit, industry_filter)
            .map_err(|e| {
                ResearchToolError(format!(
                    "An error occurred while querying the analysis history: {}",
                    e
                ))
            })?;

        if tasks.is_empty() {
            let filter_msg = industry_filter
                .map(|industry| format!(" for industry '{}'", industry))
                .unwrap_or_default();
            return Ok(QueryHistoryResult {
                report: format!(
                    "No completed analysis tasks found{} matching the criteria.",
                    filter_msg
                ),
            });
        }

        let mut report = format!("Found {} completed analysis tasks:\n", tasks.len());
        for (i, task) in tasks.iter().enumerate() {
            report.push_str(&format!("{}. Task ID: {}\n", i + 1, task.task_id));
            report.push_str(&format!("   Industry: {}\n", task.industry));
            report.push_str(&format!("   Completed: {}\n", task.timestamp.to_rfc3339()));
            report.push_str(&format!(
                "   Summary: {}\n---\n",
                task.result_summary.as_deref().unwrap_or("N/A")
            ));
        }

        Ok(QueryHistoryResult {
            report: report.trim_end().to_string(),
        })
    }
}
