//! Task aggregate persistence. A task owns its subtasks and assignees:
//! they are inserted with it, fully replaced on every update, and removed
//! with it, always inside a single transaction.

use chrono::Utc;
use sqlx::{Sqlite, Transaction};

use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::task::{
    AssigneeRead, SubtaskRead, TaskRead, TaskRow, TaskWriteRequest,
};

const TASK_SELECT: &str = "SELECT t.task_id, t.title, t.description, t.due_date, t.status, \
     t.priority, t.project_id, t.company_id, t.created_by_id, t.created_at, \
     p.name AS project_name \
     FROM tasks t LEFT JOIN projects p ON p.project_id = t.project_id";

/// Inserts the task row first to obtain its id, then every subtask and
/// assignee referencing it. Any failure rolls the whole transaction back;
/// no partial task is left behind.
pub async fn create_task(pool: &DbPool, req: TaskWriteRequest) -> AppResult<TaskRead> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "INSERT INTO tasks \
         (project_id, company_id, created_by_id, title, description, due_date, status, priority, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(req.project_id)
    .bind(req.company_id)
    .bind(req.created_by_id)
    .bind(&req.title)
    .bind(&req.description)
    .bind(req.due_date)
    .bind(req.status)
    .bind(req.priority)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?;
    let task_id = result.last_insert_rowid();

    insert_children(&mut tx, task_id, &req).await?;

    tx.commit().await?;
    task_by_id(pool, task_id).await
}

pub async fn task_by_id(pool: &DbPool, task_id: i64) -> AppResult<TaskRead> {
    let sql = format!("{TASK_SELECT} WHERE t.task_id = ?");
    let row = sqlx::query_as::<_, TaskRow>(&sql)
        .bind(task_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound { entity: "Task", id: task_id })?;
    assemble(pool, row).await
}

/// Tasks the user created or is assigned to. Matching deliberately ignores
/// the assignee active flag: an inactive assignee still sees the task.
pub async fn tasks_by_user(pool: &DbPool, user_id: i64) -> AppResult<Vec<TaskRead>> {
    let sql = format!(
        "{TASK_SELECT} WHERE t.created_by_id = ? \
         OR EXISTS (SELECT 1 FROM task_assignees a WHERE a.task_id = t.task_id AND a.user_id = ?) \
         ORDER BY t.created_at DESC"
    );
    let rows = sqlx::query_as::<_, TaskRow>(&sql)
        .bind(user_id)
        .bind(user_id)
        .fetch_all(pool)
        .await?;
    assemble_all(pool, rows).await
}

pub async fn tasks_by_project(pool: &DbPool, project_id: i64) -> AppResult<Vec<TaskRead>> {
    let sql = format!("{TASK_SELECT} WHERE t.project_id = ? ORDER BY t.created_at DESC");
    let rows = sqlx::query_as::<_, TaskRow>(&sql)
        .bind(project_id)
        .fetch_all(pool)
        .await?;
    assemble_all(pool, rows).await
}

/// Full-replace update: every scalar is overwritten from the payload and
/// the existing subtask/assignee sets are deleted and re-inserted from the
/// submitted lists. Partial-list updates are not supported.
pub async fn update_task(pool: &DbPool, task_id: i64, req: TaskWriteRequest) -> AppResult<TaskRead> {
    let mut tx = pool.begin().await?;

    let exists = sqlx::query_scalar::<_, i64>("SELECT task_id FROM tasks WHERE task_id = ?")
        .bind(task_id)
        .fetch_optional(&mut *tx)
        .await?;
    if exists.is_none() {
        return Err(AppError::NotFound { entity: "Task", id: task_id });
    }

    sqlx::query(
        "UPDATE tasks SET title = ?, description = ?, due_date = ?, status = ?, priority = ?, \
         project_id = ?, company_id = ?, created_by_id = ? WHERE task_id = ?",
    )
    .bind(&req.title)
    .bind(&req.description)
    .bind(req.due_date)
    .bind(req.status)
    .bind(req.priority)
    .bind(req.project_id)
    .bind(req.company_id)
    .bind(req.created_by_id)
    .bind(task_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM subtasks WHERE task_id = ?")
        .bind(task_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM task_assignees WHERE task_id = ?")
        .bind(task_id)
        .execute(&mut *tx)
        .await?;

    insert_children(&mut tx, task_id, &req).await?;

    tx.commit().await?;
    task_by_id(pool, task_id).await
}

/// Children first, then the task row. No DB-level cascade is relied on.
pub async fn delete_task(pool: &DbPool, task_id: i64) -> AppResult<()> {
    let mut tx = pool.begin().await?;

    let exists = sqlx::query_scalar::<_, i64>("SELECT task_id FROM tasks WHERE task_id = ?")
        .bind(task_id)
        .fetch_optional(&mut *tx)
        .await?;
    if exists.is_none() {
        return Err(AppError::NotFound { entity: "Task", id: task_id });
    }

    sqlx::query("DELETE FROM subtasks WHERE task_id = ?")
        .bind(task_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM task_assignees WHERE task_id = ?")
        .bind(task_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM tasks WHERE task_id = ?")
        .bind(task_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

async fn insert_children(
    tx: &mut Transaction<'_, Sqlite>,
    task_id: i64,
    req: &TaskWriteRequest,
) -> AppResult<()> {
    for subtask in &req.subtasks {
        sqlx::query(
            "INSERT INTO subtasks (task_id, title, due_date, due_time, completed) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(task_id)
        .bind(&subtask.title)
        .bind(subtask.due_date)
        .bind(&subtask.due_time)
        .bind(subtask.completed)
        .execute(&mut **tx)
        .await?;
    }

    for assignee in &req.assignees {
        sqlx::query(
            "INSERT INTO task_assignees (task_id, user_id, role, assigned_at, is_active, inactive_reason) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(task_id)
        .bind(assignee.user_id)
        .bind(&assignee.role)
        .bind(assignee.assigned_at.unwrap_or_else(Utc::now))
        .bind(assignee.is_active)
        .bind(&assignee.inactive_reason)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

async fn assemble(pool: &DbPool, row: TaskRow) -> AppResult<TaskRead> {
    let subtasks = sqlx::query_as::<_, SubtaskRead>(
        "SELECT subtask_id, title, due_date, due_time, completed \
         FROM subtasks WHERE task_id = ? ORDER BY subtask_id",
    )
    .bind(row.task_id)
    .fetch_all(pool)
    .await?;

    let assignees = sqlx::query_as::<_, AssigneeRead>(
        "SELECT a.user_id, u.first_name || ' ' || u.last_name AS user_name, \
         a.role, a.assigned_at, a.is_active \
         FROM task_assignees a JOIN users u ON u.user_id = a.user_id \
         WHERE a.task_id = ? ORDER BY a.user_id",
    )
    .bind(row.task_id)
    .fetch_all(pool)
    .await?;

    Ok(TaskRead {
        task_id: row.task_id,
        title: row.title,
        description: row.description,
        due_date: row.due_date,
        status: row.status,
        priority: row.priority,
        project_id: row.project_id,
        company_id: row.company_id,
        created_by_id: row.created_by_id,
        created_at: row.created_at,
        subtask_count: subtasks.len() as i64,
        assignee_count: assignees.len() as i64,
        project_name: row.project_name,
        subtasks,
        assignees,
    })
}

async fn assemble_all(pool: &DbPool, rows: Vec<TaskRow>) -> AppResult<Vec<TaskRead>> {
    let mut tasks = Vec::with_capacity(rows.len());
    for row in rows {
        tasks.push(assemble(pool, row).await?);
    }
    Ok(tasks)
}
