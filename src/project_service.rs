//! Project aggregate persistence, mirroring the task service: the team
//! roster is owned by the project and fully replaced on update, document
//! metadata rides along with the scalar columns.

use chrono::Utc;
use sqlx::{Sqlite, Transaction};

use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::project::{ProjectRead, ProjectRow, ProjectWrite, TeamMemberRead};

const PROJECT_SELECT: &str = "SELECT project_id, company_id, name, description, start_date, end_date, \
     status, technologies, document_file_name, created_at FROM projects";

const DEFAULT_TEAM_ROLE: &str = "Member";

pub async fn create_project(pool: &DbPool, req: ProjectWrite) -> AppResult<ProjectRead> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "INSERT INTO projects \
         (company_id, name, description, start_date, end_date, status, technologies, \
          document_file_name, document_path, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(req.company_id)
    .bind(&req.name)
    .bind(&req.description)
    .bind(req.start_date)
    .bind(req.end_date)
    .bind(req.status)
    .bind(&req.technologies)
    .bind(req.document.as_ref().map(|d| d.file_name.as_str()))
    .bind(req.document.as_ref().map(|d| d.stored_path.as_str()))
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?;
    let project_id = result.last_insert_rowid();

    insert_roster(&mut tx, project_id, &req.team_members).await?;

    tx.commit().await?;
    project_by_id(pool, project_id).await
}

pub async fn project_by_id(pool: &DbPool, project_id: i64) -> AppResult<ProjectRead> {
    let sql = format!("{PROJECT_SELECT} WHERE project_id = ?");
    let row = sqlx::query_as::<_, ProjectRow>(&sql)
        .bind(project_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound { entity: "Project", id: project_id })?;
    assemble(pool, row).await
}

pub async fn projects_by_company(pool: &DbPool, company_id: i64) -> AppResult<Vec<ProjectRead>> {
    let sql = format!("{PROJECT_SELECT} WHERE company_id = ? ORDER BY created_at DESC");
    let rows = sqlx::query_as::<_, ProjectRow>(&sql)
        .bind(company_id)
        .fetch_all(pool)
        .await?;

    let mut projects = Vec::with_capacity(rows.len());
    for row in rows {
        projects.push(assemble(pool, row).await?);
    }
    Ok(projects)
}

/// Overwrites every scalar and replaces the full roster. The stored
/// document is only touched when the payload carries a new one; the
/// original client re-sends a file only when the user picked one.
pub async fn update_project(
    pool: &DbPool,
    project_id: i64,
    req: ProjectWrite,
) -> AppResult<ProjectRead> {
    let mut tx = pool.begin().await?;

    let exists =
        sqlx::query_scalar::<_, i64>("SELECT project_id FROM projects WHERE project_id = ?")
            .bind(project_id)
            .fetch_optional(&mut *tx)
            .await?;
    if exists.is_none() {
        return Err(AppError::NotFound { entity: "Project", id: project_id });
    }

    sqlx::query(
        "UPDATE projects SET name = ?, description = ?, start_date = ?, end_date = ?, \
         status = ?, technologies = ? WHERE project_id = ?",
    )
    .bind(&req.name)
    .bind(&req.description)
    .bind(req.start_date)
    .bind(req.end_date)
    .bind(req.status)
    .bind(&req.technologies)
    .bind(project_id)
    .execute(&mut *tx)
    .await?;

    if let Some(doc) = &req.document {
        sqlx::query(
            "UPDATE projects SET document_file_name = ?, document_path = ? WHERE project_id = ?",
        )
        .bind(&doc.file_name)
        .bind(&doc.stored_path)
        .bind(project_id)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query("DELETE FROM project_team_members WHERE project_id = ?")
        .bind(project_id)
        .execute(&mut *tx)
        .await?;
    insert_roster(&mut tx, project_id, &req.team_members).await?;

    tx.commit().await?;
    project_by_id(pool, project_id).await
}

/// Removes the project's tasks (with their subtasks and assignees), then
/// the roster, then the project row itself, all in one transaction.
pub async fn delete_project(pool: &DbPool, project_id: i64) -> AppResult<()> {
    let mut tx = pool.begin().await?;

    let exists =
        sqlx::query_scalar::<_, i64>("SELECT project_id FROM projects WHERE project_id = ?")
            .bind(project_id)
            .fetch_optional(&mut *tx)
            .await?;
    if exists.is_none() {
        return Err(AppError::NotFound { entity: "Project", id: project_id });
    }

    sqlx::query(
        "DELETE FROM subtasks WHERE task_id IN (SELECT task_id FROM tasks WHERE project_id = ?)",
    )
    .bind(project_id)
    .execute(&mut *tx)
    .await?;
    sqlx::query(
        "DELETE FROM task_assignees WHERE task_id IN (SELECT task_id FROM tasks WHERE project_id = ?)",
    )
    .bind(project_id)
    .execute(&mut *tx)
    .await?;
    sqlx::query("DELETE FROM tasks WHERE project_id = ?")
        .bind(project_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM project_team_members WHERE project_id = ?")
        .bind(project_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM projects WHERE project_id = ?")
        .bind(project_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

async fn insert_roster(
    tx: &mut Transaction<'_, Sqlite>,
    project_id: i64,
    team_members: &[i64],
) -> AppResult<()> {
    for &user_id in team_members {
        sqlx::query(
            "INSERT INTO project_team_members (project_id, user_id, role, assigned_at) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(project_id)
        .bind(user_id)
        .bind(DEFAULT_TEAM_ROLE)
        .bind(Utc::now())
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn assemble(pool: &DbPool, row: ProjectRow) -> AppResult<ProjectRead> {
    let team_members = sqlx::query_as::<_, TeamMemberRead>(
        "SELECT m.user_id, u.first_name || ' ' || u.last_name AS user_name, \
         m.role, m.assigned_at \
         FROM project_team_members m JOIN users u ON u.user_id = m.user_id \
         WHERE m.project_id = ? ORDER BY m.user_id",
    )
    .bind(row.project_id)
    .fetch_all(pool)
    .await?;

    Ok(ProjectRead {
        project_id: row.project_id,
        company_id: row.company_id,
        name: row.name,
        description: row.description,
        start_date: row.start_date,
        end_date: row.end_date,
        status: row.status,
        technologies: row.technologies,
        document_file_name: row.document_file_name,
        created_at: row.created_at,
        team_member_count: team_members.len() as i64,
        team_members,
    })
}
