//! 任务编排器 - 研究管线的提交/轮询语义
//!
//! submit立即返回任务id，管线在独立的后台任务上跑到终态；进度与结果全程
//! 落在任务历史表里，轮询只读该表。多个分析任务可以并行，各自持有独立的
//! 工作流状态。

use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::history::{TaskHistoryStore, TaskRecord, TaskStatus};
use crate::pipeline::{WorkflowEngine, WorkflowInput};

/// 任务编排器
pub struct TaskOrchestrator {
    engine: Arc<WorkflowEngine>,
    history: Arc<TaskHistoryStore>,
}

impl TaskOrchestrator {
    pub fn new(engine: Arc<WorkflowEngine>, history: Arc<TaskHistoryStore>) -> Self {
        Self { engine, history }
    }

    /// 提交一次行业分析，写入Pending记录并调度后台执行，立即返回任务id
    pub fn submit(&self, industry: &str) -> Result<String> {
        let task_id = Uuid::new_v4().to_string();

        self.history
            .log_status(&task_id, industry, TaskStatus::Pending, None, None, None)
            .context("Failed to record pending task")?;
        println!("📨 已提交分析任务 {} (行业: {})", task_id, industry);

        tokio::spawn(run_analysis(
            self.engine.clone(),
            self.history.clone(),
            task_id.clone(),
            industry.to_string(),
        ));

        Ok(task_id)
    }

    /// 查询任务状态
    pub fn get_status(&self, task_id: &str) -> Result<Option<TaskRecord>> {
        self.history.get(task_id)
    }
}

/// 后台执行：Running → 引擎运行 → 终态分类与时长记录
async fn run_analysis(
    engine: Arc<WorkflowEngine>,
    history: Arc<TaskHistoryStore>,
    task_id: String,
    industry: String,
) {
    println!("🚀 开始后台分析任务 {} (行业: {})", task_id, industry);
    let started = Utc::now();

    if let Err(e) = history.log_status(
        &task_id,
        &industry,
        TaskStatus::Running,
        None,
        Some(started),
        None,
    ) {
        eprintln!("⚠️ 记录任务 {} 的Running状态失败: {}", task_id, e);
    }

    // 引擎自身不抛异常；再包一层spawn捕获编排之外的panic
    let run = {
        let engine = engine.clone();
        let industry = industry.clone();
        tokio::spawn(async move { engine.run(WorkflowInput::for_industry(industry)).await })
    };

    let (status, result_summary) = match run.await {
        Ok(state) => {
            if let Some(synthesis) = state.synthesis_result {
                (TaskStatus::Completed, synthesis)
            } else if let Some(error) = state.error_message {
                (TaskStatus::Failed, error)
            } else {
                // 防御分支：既无结果也无错误
                (
                    TaskStatus::Unknown,
                    "Workflow finished without a result or an error.".to_string(),
                )
            }
        }
        Err(e) => (
            TaskStatus::Failed,
            format!("An unexpected error occurred: {}", e),
        ),
    };

    let duration_seconds = (Utc::now() - started).num_seconds();
    println!(
        "🏁 分析任务 {} 结束: {} ({}秒)",
        task_id, status, duration_seconds
    );

    if let Err(e) = history.log_status(
        &task_id,
        &industry,
        status,
        Some(&result_summary),
        None,
        Some(duration_seconds),
    ) {
        eprintln!("⚠️ 记录任务 {} 的终态失败: {}", task_id, e);
    }
}

// Include tests
#[cfg(test)]
mod tests;
