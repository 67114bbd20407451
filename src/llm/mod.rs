//! LLM接入层 - 统一客户端、Provider适配与预置工具

pub mod client;
pub mod tools;

use anyhow::Result;
use async_trait::async_trait;

/// 文本补全服务接口
///
/// 管线各阶段只依赖这一接口，生产实现由[`client::LLMClient`]给出，
/// 测试用内存mock替换。失败是可恢复的，调用方负责折算为本地哨兵。
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}
