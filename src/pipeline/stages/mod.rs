//! 图节点实现
//!
//! 每个节点只通过共享的[`WorkflowState`](super::state::WorkflowState)交换
//! 数据；研究路径的节点在入口检查`error_message`，已失败时立即空转。节点
//! 内部的任何失败都折算进状态，不向引擎抛异常。

pub mod basic_agent;
pub mod discover;
pub mod handle_error;
pub mod identify;
pub mod retrieve;
pub mod route;
pub mod summarize;
pub mod synthesize;
