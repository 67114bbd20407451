//! 共享领域类型 - 工作流状态中流转的标签化结果与对话消息

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 请求类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestKind {
    /// 自由问答，走基础Agent路径
    AgentQuery,
    /// 行业分析，走研究管线路径
    IndustryAnalysis,
}

/// 对话角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatRole {
    User,
    Assistant,
}

/// 对话消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            text: text.into(),
        }
    }
}

/// 阶段错误分类
///
/// InvalidInput快速失败不重试；Transient重试后再上浮；ContentIssue按
/// Warning/Skipped哨兵处理，管线继续；PipelineFatal中止整次运行。
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StageError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Transient failure: {0}")]
    Transient(String),
    #[error("Content issue: {0}")]
    ContentIssue(String),
    #[error("Pipeline failure: {0}")]
    PipelineFatal(String),
}

/// 报告URL检索结果
///
/// 每家公司要么有URL，要么是"搜索过但没找到"，要么是"搜索本身失败"。
/// 后续阶段据此分流，条目只增不减。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UrlOutcome {
    Found(String),
    NotFound,
    Error(String),
}

impl UrlOutcome {
    pub fn url(&self) -> Option<&str> {
        match self {
            UrlOutcome::Found(url) => Some(url),
            _ => None,
        }
    }
}

/// 文本提取结果
///
/// Warning表示"处理成功但内容不可用"（例如纯图片PDF），与Error区分保留
/// 以便诊断，但下游阶段对两者一视同仁（跳过）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextOutcome {
    Ok(String),
    Warning(String),
    Error(String),
}

impl TextOutcome {
    /// 是否为可供摘要的正常文本
    pub fn is_usable(&self) -> bool {
        matches!(self, TextOutcome::Ok(text) if !text.trim().is_empty())
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            TextOutcome::Ok(text) => Some(text),
            _ => None,
        }
    }
}

/// 摘要结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SummaryOutcome {
    Ok(String),
    Skipped(String),
    Error(String),
}

impl SummaryOutcome {
    /// 是否为可参与综合的有效摘要
    pub fn is_usable(&self) -> bool {
        matches!(self, SummaryOutcome::Ok(text) if !text.trim().is_empty())
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            SummaryOutcome::Ok(text) => Some(text),
            _ => None,
        }
    }
}
