//! 工作流图引擎 - 带条件路由的有向图状态机
//!
//! 节点在单次执行内严格串行；入口的路由节点决定走研究管线还是基础Agent，
//! 研究路径的每个节点之后有统一的条件边：`error_message`为空继续下一阶段，
//! 否则转入HandleError。引擎自身不抛异常，任何失败都落在返回的状态里。

use crate::pipeline::context::PipelineContext;
use crate::pipeline::stages;
use crate::pipeline::state::{WorkflowInput, WorkflowState};

/// 图节点
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    Route,
    IdentifyCompanies,
    SearchReports,
    DownloadExtract,
    SummarizeReports,
    SynthesizeTrends,
    RunBasicAgent,
    HandleError,
    Terminal,
}

/// 工作流图引擎
pub struct WorkflowEngine {
    context: PipelineContext,
}

impl WorkflowEngine {
    pub fn new(context: PipelineContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &PipelineContext {
        &self.context
    }

    /// 执行一次完整的工作流
    ///
    /// 节点数超过recursion_limit时强制终止——按构造图中不存在环路，
    /// 上限是防御性的不变量而非功能开关。
    pub async fn run(&self, input: WorkflowInput) -> WorkflowState {
        let mut state = WorkflowState::new(input);
        let mut node = Node::Route;
        let mut steps = 0;
        let limit = self.context.config.workflow.recursion_limit;

        while node != Node::Terminal {
            steps += 1;
            if steps > limit {
                eprintln!("   ❌ 工作流节点数超过上限({})，强制终止", limit);
                state.fail(format!(
                    "Workflow aborted: node execution limit of {} exceeded.",
                    limit
                ));
                stages::handle_error::run(&mut state);
                break;
            }

            node = self.execute(node, &mut state).await;
        }

        state
    }

    /// 执行单个节点并返回下一个节点
    async fn execute(&self, node: Node, state: &mut WorkflowState) -> Node {
        match node {
            Node::Route => {
                stages::route::run(state);
                decide_route(state)
            }
            Node::IdentifyCompanies => {
                stages::identify::run(state, &self.context).await;
                next_or_error(state, Node::SearchReports)
            }
            Node::SearchReports => {
                stages::discover::run(state, &self.context).await;
                next_or_error(state, Node::DownloadExtract)
            }
            Node::DownloadExtract => {
                stages::retrieve::run(state, &self.context).await;
                next_or_error(state, Node::SummarizeReports)
            }
            Node::SummarizeReports => {
                stages::summarize::run(state, &self.context).await;
                next_or_error(state, Node::SynthesizeTrends)
            }
            Node::SynthesizeTrends => {
                stages::synthesize::run(state, &self.context).await;
                next_or_error(state, Node::Terminal)
            }
            Node::RunBasicAgent => {
                // Agent的失败也记录进状态后正常终止，不走HandleError
                stages::basic_agent::run(state, &self.context).await;
                Node::Terminal
            }
            Node::HandleError => {
                stages::handle_error::run(state);
                Node::Terminal
            }
            Node::Terminal => Node::Terminal,
        }
    }
}

/// 入口路由：行业优先于查询，两者皆无则进错误处理
fn decide_route(state: &WorkflowState) -> Node {
    if state.industry.as_deref().is_some_and(|s| !s.trim().is_empty()) {
        Node::IdentifyCompanies
    } else if state
        .input_query
        .as_deref()
        .is_some_and(|s| !s.trim().is_empty())
    {
        Node::RunBasicAgent
    } else {
        Node::HandleError
    }
}

/// 研究路径的统一条件边
fn next_or_error(state: &WorkflowState, next: Node) -> Node {
    if state.has_failed() {
        Node::HandleError
    } else {
        next
    }
}
