//! 基础Agent的预置研究工具

pub mod download;
pub mod extract;
pub mod history;
pub mod search;

pub use download::AgentToolDownloadReport;
pub use extract::AgentToolExtractText;
pub use history::AgentToolQueryHistory;
pub use search::AgentToolWebSearch;

/// 预置工具集合，构建Agent时整体挂载
#[derive(Clone)]
pub struct PresetTools {
    pub search: AgentToolWebSearch,
    pub download: AgentToolDownloadReport,
    pub extract: AgentToolExtractText,
    pub history: AgentToolQueryHistory,
}

/// 工具执行错误
#[derive(Debug)]
pub struct ResearchToolError(pub String);

impl std::fmt::Display for ResearchToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Research tool error: {}", self.0)
    }
}

impl std::error::Error for ResearchToolError {}
