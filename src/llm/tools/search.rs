//! 网络搜索工具

use rig::tool::Tool;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::ResearchToolError;
use crate::search::SearchService;

/// 搜索工具
#[derive(Clone)]
pub struct AgentToolWebSearch {
    search: Arc<dyn SearchService>,
    max_results: usize,
}

/// 搜索参数
#[derive(Debug, Deserialize)]
pub struct WebSearchArgs {
    pub query: String,
}

/// 搜索结果
#[derive(Debug, Serialize)]
pub struct WebSearchResult {
    pub results: String,
}

impl AgentToolWebSearch {
    pub fn new(search: Arc<dyn SearchService>, max_results: usize) -> Self {
        Self {
            search,
            max_results,
        }
    }
}

impl Tool for AgentToolWebSearch {
    const NAME: &'static str = "web_search";

    type Error = ResearchToolError;
    type Args = WebSearchArgs;
    type Output = WebSearchResult;

    async fn definition(&self, _prompt: String) -> rig::completion::ToolDefinition {
        rig::completion::ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Performs a web search and returns numbered results with title, URL and snippet. Useful for current events, company facts, and locating report documents. Input is a plain search query.".to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The search query."
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        println!("   🔧 tool called...web_search@{}", args.query);

        let results = self
            .search
            .search(&args.query, self.max_results)
            .await
            .map_err(|e| ResearchToolError(format!("Error during search: {}", e)))?;

        Ok(WebSearchResult { results })
    }
}
