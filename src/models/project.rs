use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Planned,
    InProgress,
    Completed,
}

impl FromStr for ProjectStatus {
    type Err = String;

    // Multipart form values arrive as plain text, not JSON.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Planned" => Ok(ProjectStatus::Planned),
            "InProgress" | "In Progress" => Ok(ProjectStatus::InProgress),
            "Completed" => Ok(ProjectStatus::Completed),
            other => Err(format!("unknown project status '{}'", other)),
        }
    }
}

/// Metadata of an uploaded project document. The bytes live on disk under
/// `stored_path`; only this metadata is persisted.
#[derive(Debug, Clone)]
pub struct DocumentMeta {
    pub file_name: String,
    pub stored_path: String,
}

/// Assembled from the multipart form by the handler; used by both create
/// and update. The team roster is full-replace on update.
#[derive(Debug, Clone, Default)]
pub struct ProjectWrite {
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: ProjectStatus,
    pub technologies: Option<String>,
    pub company_id: i64,
    pub team_members: Vec<i64>,
    pub document: Option<DocumentMeta>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ProjectRow {
    pub project_id: i64,
    pub company_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: ProjectStatus,
    pub technologies: Option<String>,
    pub document_file_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMemberRead {
    pub user_id: i64,
    pub user_name: String,
    pub role: String,
    pub assigned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRead {
    pub project_id: i64,
    pub company_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: ProjectStatus,
    pub technologies: Option<String>,
    pub document_file_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub team_member_count: i64,
    pub team_members: Vec<TeamMemberRead>,
}
