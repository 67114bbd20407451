//! 错误终结节点 - 把管线级失败落为最终状态

use crate::pipeline::state::WorkflowState;

pub fn run(state: &mut WorkflowState) {
    println!("--- 节点: handle_error ---");

    let error = state
        .error_message
        .clone()
        .unwrap_or_else(|| "Unknown error".to_string());
    eprintln!("   ❌ 工作流执行失败: {}", error);
    state.error_message = Some(error);
}
