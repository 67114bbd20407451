//! 工作流状态 - 贯穿所有节点的单一可变记录

use std::collections::BTreeMap;

use crate::types::{ChatMessage, RequestKind, SummaryOutcome, TextOutcome, UrlOutcome};

/// 工作流的外部输入
#[derive(Debug, Clone, Default)]
pub struct WorkflowInput {
    /// 自由问答的查询文本
    pub input_query: Option<String>,

    /// 行业分析的行业名
    pub industry: Option<String>,

    /// 已有的对话历史（仅问答路径使用）
    pub messages: Vec<ChatMessage>,
}

impl WorkflowInput {
    pub fn for_query(query: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            input_query: Some(query.into()),
            industry: None,
            messages,
        }
    }

    pub fn for_industry(industry: impl Into<String>) -> Self {
        Self {
            input_query: None,
            industry: Some(industry.into()),
            messages: Vec::new(),
        }
    }
}

/// 工作流状态
///
/// 每次执行持有独立实例，节点串行地读写它；公司键控的三个映射只增不减，
/// 单个公司的失败以哨兵值记录而不是从映射里消失。成功终止时
/// agent_response、synthesis_result、error_message至多一个有值。
#[derive(Debug, Clone)]
pub struct WorkflowState {
    /// 请求类型
    pub request_kind: RequestKind,

    /// 自由问答的查询文本
    pub input_query: Option<String>,

    /// 行业分析的行业名
    pub industry: Option<String>,

    /// 对话历史
    pub messages: Vec<ChatMessage>,

    /// 基础Agent的回答
    pub agent_response: Option<String>,

    /// 识别出的公司列表，保序且去重
    pub companies: Vec<String>,

    /// 公司 → 报告URL检索结果
    pub report_urls: BTreeMap<String, UrlOutcome>,

    /// 公司 → 提取文本结果
    pub extracted_texts: BTreeMap<String, TextOutcome>,

    /// 公司 → 摘要结果
    pub summaries: BTreeMap<String, SummaryOutcome>,

    /// 跨公司趋势综合结果
    pub synthesis_result: Option<String>,

    /// 管线级错误，存在即表示整次运行失败
    pub error_message: Option<String>,
}

impl WorkflowState {
    pub fn new(input: WorkflowInput) -> Self {
        let request_kind = if input.industry.is_some() {
            RequestKind::IndustryAnalysis
        } else {
            RequestKind::AgentQuery
        };

        Self {
            request_kind,
            input_query: input.input_query,
            industry: input.industry,
            messages: input.messages,
            agent_response: None,
            companies: Vec::new(),
            report_urls: BTreeMap::new(),
            extracted_texts: BTreeMap::new(),
            summaries: BTreeMap::new(),
            synthesis_result: None,
            error_message: None,
        }
    }

    /// 管线是否已失败
    pub fn has_failed(&self) -> bool {
        self.error_message.is_some()
    }

    /// 记录管线级失败
    pub fn fail(&mut self, message: impl Into<String>) {
        self.error_message = Some(message.into());
    }
}
