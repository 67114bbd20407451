//! ReAct模式的配置与响应类型

use rig::completion::Message;

/// ReAct执行配置
#[derive(Debug, Clone)]
pub struct ReActConfig {
    /// 最大迭代次数
    pub max_iterations: usize,

    /// 是否输出详细日志
    pub verbose: bool,

    /// 达到最大迭代次数时返回部分结果而非报错
    pub return_partial_on_max_depth: bool,
}

impl Default for ReActConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            verbose: false,
            return_partial_on_max_depth: true,
        }
    }
}

/// ReAct执行响应
#[derive(Debug, Clone)]
pub struct ReActResponse {
    /// 最终回答内容
    pub content: String,

    /// 实际使用的迭代次数
    pub iterations_used: usize,

    /// 是否因达到最大迭代次数而中断
    pub stopped_by_max_depth: bool,

    /// 过程中的工具调用记录
    pub tool_calls_history: Vec<String>,

    /// 执行后的完整对话历史
    pub chat_history: Vec<Message>,
}

impl ReActResponse {
    /// 正常完成的响应
    pub fn success(content: String, iterations_used: usize, chat_history: Vec<Message>) -> Self {
        Self {
            content,
            iterations_used,
            stopped_by_max_depth: false,
            tool_calls_history: Vec::new(),
            chat_history,
        }
    }

    /// 达到最大迭代次数的部分结果
    pub fn max_depth_reached(
        content: String,
        max_depth: usize,
        tool_calls_history: Vec<String>,
        chat_history: Vec<Message>,
    ) -> Self {
        Self {
            content,
            iterations_used: max_depth,
            stopped_by_max_depth: true,
            tool_calls_history,
            chat_history,
        }
    }
}
