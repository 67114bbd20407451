//! LLM客户端 - 提供统一的LLM服务接口

use anyhow::Result;
use async_trait::async_trait;
use rig::completion::Message;
use std::future::Future;
use std::time::Duration;

use crate::config::Config;
use crate::llm::CompletionService;
use crate::llm::tools::PresetTools;

mod providers;
mod react;
mod react_executor;

pub use react::{ReActConfig, ReActResponse};

use providers::ProviderClient;
use react_executor::ReActExecutor;

/// LLM客户端 - 提供统一的LLM服务接口
#[derive(Clone)]
pub struct LLMClient {
    config: Config,
    client: ProviderClient,
}

impl LLMClient {
    /// 创建新的LLM客户端
    pub fn new(config: Config) -> Result<Self> {
        let client = ProviderClient::new(&config.llm)?;
        Ok(Self { client, config })
    }

    /// 检查模型连接和功能是否正常
    pub async fn check_connection(&self) -> Result<()> {
        println!("🔄 正在检查模型连接...");
        // 使用一个简单的prompt来测试连接
        match self
            .prompt_model(
                &self.config.llm.model_main,
                "System: You are a helpful assistant.",
                "Hello",
            )
            .await
        {
            Ok(_) => {
                println!("✅ 模型连接正常");
                Ok(())
            }
            Err(e) => {
                eprintln!("❌ 模型连接失败: {}", e);
                Err(e)
            }
        }
    }

    /// 通用重试逻辑，用于处理异步操作的重试机制
    async fn retry_with_backoff<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, anyhow::Error>>,
    {
        let llm_config = &self.config.llm;
        let max_retries = llm_config.retry_attempts;
        let retry_delay_ms = llm_config.retry_delay_ms;
        let mut retries = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(err) => {
                    retries += 1;
                    eprintln!(
                        "❌ 调用模型服务出错，重试中 (第 {} / {}次尝试): {}",
                        retries, max_retries, err
                    );
                    if retries >= max_retries {
                        return Err(err);
                    }
                    tokio::time::sleep(Duration::from_millis(retry_delay_ms)).await;
                }
            }
        }
    }

    /// 指定模型的单轮对话（不使用工具），带重试与单次调用超时
    pub async fn prompt_model(
        &self,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String> {
        let agent = self
            .client
            .create_agent(model, system_prompt, &self.config.llm);
        let timeout = Duration::from_secs(self.config.llm.timeout_seconds);

        self.retry_with_backoff(|| async {
            tokio::time::timeout(timeout, agent.prompt(user_prompt))
                .await
                .map_err(|_| {
                    anyhow::anyhow!(
                        "LLM call timed out after {}s",
                        self.config.llm.timeout_seconds
                    )
                })?
        })
        .await
    }

    /// 携带工具与对话历史执行ReAct多轮对话
    ///
    /// ReAct循环本身有迭代上限，不在此层重试：重试会向已变更的对话历史
    /// 重复追加消息。
    pub async fn prompt_with_tools(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        tools: &PresetTools,
        history: Vec<Message>,
        react_config: ReActConfig,
    ) -> Result<ReActResponse> {
        let agent = if self.config.llm.disable_preset_tools {
            self.client
                .create_agent(&self.config.llm.model_main, system_prompt, &self.config.llm)
        } else {
            self.client.create_agent_with_tools(
                &self.config.llm.model_main,
                system_prompt,
                &self.config.llm,
                tools,
            )
        };

        ReActExecutor::execute(&agent, user_prompt, history, &react_config).await
    }

    /// 主模型的补全端点，用于公司识别与趋势综合
    pub fn main_endpoint(&self, system_prompt: &str) -> CompletionEndpoint {
        CompletionEndpoint {
            client: self.clone(),
            model: self.config.llm.model_main.clone(),
            system_prompt: system_prompt.to_string(),
        }
    }

    /// 摘要模型的补全端点，用于map-reduce摘要
    pub fn summary_endpoint(&self, system_prompt: &str) -> CompletionEndpoint {
        CompletionEndpoint {
            client: self.clone(),
            model: self.config.llm.model_summary.clone(),
            system_prompt: system_prompt.to_string(),
        }
    }
}

/// 绑定到具体模型的补全端点
pub struct CompletionEndpoint {
    client: LLMClient,
    model: String,
    system_prompt: String,
}

#[async_trait]
impl CompletionService for CompletionEndpoint {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.client
            .prompt_model(&self.model, &self.system_prompt, prompt)
            .await
    }
}
