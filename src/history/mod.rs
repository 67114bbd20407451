//! 任务历史存储 - 分析任务元数据的持久化表
//!
//! 单表`analysis_tasks`按task_id主键保存每次行业分析的状态与结果，
//! 记录只做整行替换更新，从不删除。常用的第二访问路径是"最近N条
//! COMPLETED记录（可按行业过滤），新者在前"。

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// 任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    /// 兜底状态：运行结束但既无综合结果也无错误
    Unknown,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Running => "RUNNING",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Failed => "FAILED",
            TaskStatus::Unknown => "UNKNOWN",
        }
    }

    fn from_str(s: &str) -> Self {
        match s {
            "PENDING" => TaskStatus::Pending,
            "RUNNING" => TaskStatus::Running,
            "COMPLETED" => TaskStatus::Completed,
            "FAILED" => TaskStatus::Failed,
            _ => TaskStatus::Unknown,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 任务记录
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub task_id: String,
    pub industry: String,
    pub status: TaskStatus,
    pub result_summary: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i64>,
    pub timestamp: DateTime<Utc>,
}

/// 任务历史存储
pub struct TaskHistoryStore {
    conn: Mutex<Connection>,
}

impl TaskHistoryStore {
    /// 打开（必要时创建）数据库文件并初始化表结构
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .context(format!("Failed to create history dir: {:?}", parent))?;
        }

        let conn = Connection::open(db_path)
            .context(format!("Failed to open history database: {:?}", db_path))?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// 打开内存数据库（测试用）
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS analysis_tasks (
                task_id TEXT PRIMARY KEY,
                industry TEXT NOT NULL,
                status TEXT NOT NULL,
                result_summary TEXT,
                start_time DATETIME,
                duration_seconds INTEGER,
                timestamp DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )
        .context("Failed to create analysis_tasks table")?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_status_timestamp ON analysis_tasks (status, timestamp)",
            [],
        )
        .context("Failed to create status/timestamp index")?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("History store lock poisoned"))
    }

    /// 记录或更新任务状态
    ///
    /// 整行INSERT OR REPLACE；更新时若未提供start_time则保留已有值，
    /// timestamp总是刷新为当前时间。
    pub fn log_status(
        &self,
        task_id: &str,
        industry: &str,
        status: TaskStatus,
        result_summary: Option<&str>,
        start_time: Option<DateTime<Utc>>,
        duration_seconds: Option<i64>,
    ) -> Result<()> {
        let conn = self.conn()?;

        let existing_start: Option<String> = conn
            .query_row(
                "SELECT start_time FROM analysis_tasks WHERE task_id = ?1",
                rusqlite::params![task_id],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to read existing start_time")?
            .flatten();

        let final_start_time = start_time
            .map(|t| t.to_rfc3339())
            .or(existing_start);

        conn.execute(
            "INSERT OR REPLACE INTO analysis_tasks
             (task_id, industry, status, result_summary, start_time, duration_seconds, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                task_id,
                industry,
                status.as_str(),
                result_summary,
                final_start_time,
                duration_seconds,
                Utc::now().to_rfc3339(),
            ],
        )
        .context(format!("Failed to log status for task {}", task_id))?;

        Ok(())
    }

    /// 按task_id查询单条记录
    pub fn get(&self, task_id: &str) -> Result<Option<TaskRecord>> {
        let conn = self.conn()?;

        conn.query_row(
            "SELECT task_id, industry, status, result_summary, start_time, duration_seconds, timestamp
             FROM analysis_tasks WHERE task_id = ?1",
            rusqlite::params![task_id],
            row_to_record,
        )
        .optional()
        .context(format!("Failed to query task {}", task_id))
    }

    /// 查询最近的COMPLETED任务，按时间新者在前，可按行业过滤（不区分大小写）
    pub fn query_completed(
        &self,
        limit: usize,
        industry_filter: Option<&str>,
    ) -> Result<Vec<TaskRecord>> {
        let conn = self.conn()?;

        let rows = if let Some(industry) = industry_filter {
            let mut stmt = conn
                .prepare(
                    "SELECT task_id, industry, status, result_summary, start_time, duration_seconds, timestamp
                     FROM analysis_tasks
                     WHERE status = 'COMPLETED' AND LOWER(industry) = LOWER(?1)
                     ORDER BY timestamp DESC LIMIT ?2",
                )
                .context("Failed to prepare history query")?;
            stmt.query_map(rusqlite::params![industry, limit as i64], row_to_record)
                .context("Failed to query completed tasks")?
                .collect::<Result<Vec<_>, _>>()
        } else {
            let mut stmt = conn
                .prepare(
                    "SELECT task_id, industry, status, result_summary, start_time, duration_seconds, timestamp
                     FROM analysis_tasks
                     WHERE status = 'COMPLETED'
                     ORDER BY timestamp DESC LIMIT ?1",
                )
                .context("Failed to prepare history query")?;
            stmt.query_map(rusqlite::params![limit as i64], row_to_record)
                .context("Failed to query completed tasks")?
                .collect::<Result<Vec<_>, _>>()
        }
        .context("Failed to read completed task rows")?;

        Ok(rows)
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<TaskRecord> {
    let status: String = row.get(2)?;
    let start_time: Option<String> = row.get(4)?;
    let timestamp: Option<String> = row.get(6)?;

    Ok(TaskRecord {
        task_id: row.get(0)?,
        industry: row.get(1)?,
        status: TaskStatus::from_str(&status),
        result_summary: row.get(3)?,
        start_time: start_time.and_then(|t| parse_timestamp(&t)),
        duration_seconds: row.get(5)?,
        timestamp: timestamp
            .and_then(|t| parse_timestamp(&t))
            .unwrap_or_else(Utc::now),
    })
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
