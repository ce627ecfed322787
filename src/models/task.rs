use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};

/// Kanban-style lifecycle of a task. Stored as snake_case text, serialized
/// under the variant name ("InProgress") on the wire.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Review,
    Completed,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtaskWriteRequest {
    pub title: String,
    pub due_date: Option<NaiveDate>,
    /// Wall-clock time of day, e.g. "10:00".
    pub due_time: Option<String>,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssigneeWriteRequest {
    pub user_id: i64,
    pub role: String,
    /// Defaults to the write timestamp when not supplied.
    pub assigned_at: Option<DateTime<Utc>>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub inactive_reason: Option<String>,
}

/// Full task payload, used by both create and update. Updates are
/// full-replace: every scalar is overwritten and the subtask/assignee sets
/// submitted here become the entire new sets.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskWriteRequest {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: TaskPriority,
    pub project_id: i64,
    pub company_id: i64,
    pub created_by_id: i64,
    #[serde(default)]
    pub subtasks: Vec<SubtaskWriteRequest>,
    #[serde(default)]
    pub assignees: Vec<AssigneeWriteRequest>,
}

/// Scalar task columns plus the resolved project name.
#[derive(Debug, Clone, FromRow)]
pub struct TaskRow {
    pub task_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub project_id: i64,
    pub company_id: i64,
    pub created_by_id: i64,
    pub created_at: DateTime<Utc>,
    pub project_name: Option<String>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtaskRead {
    pub subtask_id: i64,
    pub title: String,
    pub due_date: Option<NaiveDate>,
    pub due_time: Option<String>,
    pub completed: bool,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssigneeRead {
    pub user_id: i64,
    /// Resolved "<first> <last>" so list screens never fetch users separately.
    pub user_name: String,
    pub role: String,
    pub assigned_at: DateTime<Utc>,
    pub is_active: bool,
}

/// Denormalized read shape returned by every task endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRead {
    pub task_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub project_id: i64,
    pub company_id: i64,
    pub created_by_id: i64,
    pub created_at: DateTime<Utc>,
    pub subtask_count: i64,
    pub assignee_count: i64,
    pub project_name: Option<String>,
    pub subtasks: Vec<SubtaskRead>,
    pub assignees: Vec<AssigneeRead>,
}
