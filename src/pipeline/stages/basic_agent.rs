//! 基础Agent节点

use crate::pipeline::context::PipelineContext;
use crate::pipeline::state::WorkflowState;

pub async fn run(state: &mut WorkflowState, ctx: &PipelineContext) {
    println!("--- 节点: run_basic_agent ---");

    let Some(query) = state.input_query.clone() else {
        state.fail("No query provided for the basic agent.");
        return;
    };

    println!("   🤖 基础Agent处理查询: {}", query);
    match ctx.agent.run(&query, &state.messages).await {
        Ok(outcome) => {
            state.messages = outcome.updated_history;
            state.agent_response = Some(outcome.final_text);
        }
        Err(e) => {
            state.fail(format!("Failed during basic agent execution: {}", e));
        }
    }
}
