//! 路由节点 - 决定请求走研究路径还是问答路径

use crate::pipeline::state::WorkflowState;

pub fn run(state: &mut WorkflowState) {
    println!("--- 节点: route_request ---");

    if state.industry.as_deref().is_some_and(|s| !s.trim().is_empty()) {
        println!("   ➡️ 路由决策: 研究管线路径");
    } else if state
        .input_query
        .as_deref()
        .is_some_and(|s| !s.trim().is_empty())
    {
        println!("   ➡️ 路由决策: 基础Agent路径");
    } else {
        println!("   ➡️ 路由决策: 无有效输入");
        state.fail("No valid input found: provide either an industry to analyze or a query.");
    }
}
