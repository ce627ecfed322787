use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;

use crate::app_state::AppState;
use crate::auth::{current_user, require, Capability};
use crate::error::{AppError, AppResult};
use crate::models::user::UserRead;

const USER_SELECT: &str =
    "SELECT user_id, company_id, first_name, last_name, email, role FROM users";

#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub query: String,
}

/// GET /api/users/find_user_email?query=...
/// Substring search over emails, scoped to the caller's company.
pub async fn find_user_email(
    req: HttpRequest,
    data: web::Data<AppState>,
    query: web::Query<EmailQuery>,
) -> AppResult<HttpResponse> {
    let user = current_user(&req)?;
    require(&user, Capability::ViewUsers)?;

    let pattern = format!("%{}%", query.query);
    let sql = format!("{USER_SELECT} WHERE company_id = ? AND email LIKE ? ORDER BY email");
    let users = sqlx::query_as::<_, UserRead>(&sql)
        .bind(user.company_id)
        .bind(&pattern)
        .fetch_all(&data.db)
        .await?;

    Ok(HttpResponse::Ok().json(users))
}

/// GET /api/users/get/{id}
pub async fn get_user_by_id(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let user = current_user(&req)?;
    require(&user, Capability::ViewUsers)?;

    let user_id = path.into_inner();
    let sql = format!("{USER_SELECT} WHERE user_id = ?");
    let found = sqlx::query_as::<_, UserRead>(&sql)
        .bind(user_id)
        .fetch_optional(&data.db)
        .await?
        .ok_or(AppError::NotFound { entity: "User", id: user_id })?;

    Ok(HttpResponse::Ok().json(found))
}
