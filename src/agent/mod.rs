//! 基础Agent - 自由问答路径的工具化对话循环
//!
//! 对话历史是显式传入传出的值：每次调用把外部历史转换为模型消息，执行
//! 有界的多轮工具循环，再把更新后的历史转换回去，不依赖任何隐藏的可变
//! 单例。

use anyhow::Result;
use async_trait::async_trait;
use rig::completion::message::UserContent;
use rig::completion::{AssistantContent, Message};

use crate::config::Config;
use crate::llm::client::{LLMClient, ReActConfig};
use crate::llm::tools::PresetTools;
use crate::types::{ChatMessage, ChatRole};

const AGENT_SYSTEM_PROMPT: &str = "You are a research assistant specialized in corporate sustainability. \
Answer the user's question as well as you can. You have access to tools for web search, downloading PDF reports, \
extracting report text, and querying the history of completed industry analyses. \
Use tools when the question requires current facts or report contents; answer directly otherwise.";

/// Agent调用结果
#[derive(Debug, Clone)]
pub struct AgentOutcome {
    /// 最终回答
    pub final_text: String,

    /// 更新后的对话历史（含本轮问答）
    pub updated_history: Vec<ChatMessage>,
}

/// 工具化对话循环接口
#[async_trait]
pub trait AgentLoop: Send + Sync {
    async fn run(&self, query: &str, history: &[ChatMessage]) -> Result<AgentOutcome>;
}

/// 基于LLM客户端与预置研究工具的生产实现
pub struct ResearchAgent {
    llm: LLMClient,
    tools: PresetTools,
    config: Config,
}

impl ResearchAgent {
    pub fn new(llm: LLMClient, tools: PresetTools, config: Config) -> Self {
        Self { llm, tools, config }
    }
}

#[async_trait]
impl AgentLoop for ResearchAgent {
    async fn run(&self, query: &str, history: &[ChatMessage]) -> Result<AgentOutcome> {
        let react_config = ReActConfig {
            max_iterations: self.config.llm.max_iterations,
            verbose: self.config.verbose,
            ..ReActConfig::default()
        };

        let response = self
            .llm
            .prompt_with_tools(
                AGENT_SYSTEM_PROMPT,
                query,
                &self.tools,
                to_model_messages(history),
                react_config,
            )
            .await?;

        Ok(AgentOutcome {
            final_text: response.content,
            updated_history: to_chat_messages(&response.chat_history),
        })
    }
}

/// 外部对话历史 → 模型消息
fn to_model_messages(history: &[ChatMessage]) -> Vec<Message> {
    history
        .iter()
        .map(|msg| match msg.role {
            ChatRole::User => Message::user(msg.text.clone()),
            ChatRole::Assistant => Message::assistant(msg.text.clone()),
        })
        .collect()
}

/// 模型消息 → 外部对话历史
///
/// 只保留文本内容，工具调用与工具结果不进入外部历史。
fn to_chat_messages(messages: &[Message]) -> Vec<ChatMessage> {
    messages
        .iter()
        .filter_map(|msg| match msg {
            Message::User { content } => {
                let text = content
                    .iter()
                    .filter_map(|c| {
                        if let UserContent::Text(text) = c {
                            Some(text.text.clone())
                        } else {
                            None
                        }
                    })
                    .collect::<Vec<_>>()
                    .join("\n");
                (!text.is_empty()).then(|| ChatMessage::user(text))
            }
            Message::Assistant { content, .. } => {
                let text = content
                    .iter()
                    .filter_map(|c| {
                        if let AssistantContent::Text(text) = c {
                            Some(text.text.clone())
                        } else {
                            None
                        }
                    })
                    .collect::<Vec<_>>()
                    .join("\n");
                (!text.is_empty()).then(|| ChatMessage::assistant(text))
            }
        })
        .collect()
}
