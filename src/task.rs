use actix_web::{web, HttpRequest, HttpResponse};
use log::info;

use crate::app_state::AppState;
use crate::auth::{current_user, require, Capability};
use crate::error::AppResult;
use crate::models::task::TaskWriteRequest;
use crate::task_service;

/// POST /api/tasks
pub async fn create_task(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<TaskWriteRequest>,
) -> AppResult<HttpResponse> {
    let user = current_user(&req)?;
    require(&user, Capability::ManageTasks)?;

    let created = task_service::create_task(&data.db, payload.into_inner()).await?;
    info!("task {} created by user {}", created.task_id, user.user_id);
    Ok(HttpResponse::Created().json(created))
}

/// GET /api/tasks/{id}
pub async fn get_task(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let user = current_user(&req)?;
    require(&user, Capability::ViewTasks)?;

    let task = task_service::task_by_id(&data.db, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(task))
}

/// GET /api/tasks/user/{user_id}
pub async fn tasks_by_user(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let user = current_user(&req)?;
    require(&user, Capability::ViewTasks)?;

    let tasks = task_service::tasks_by_user(&data.db, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(tasks))
}

/// GET /api/tasks/project/{project_id}
pub async fn tasks_by_project(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let user = current_user(&req)?;
    require(&user, Capability::ViewTasks)?;

    let tasks = task_service::tasks_by_project(&data.db, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(tasks))
}

/// PUT /api/tasks/{id}. Full replace, children included.
pub async fn update_task(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<i64>,
    payload: web::Json<TaskWriteRequest>,
) -> AppResult<HttpResponse> {
    let user = current_user(&req)?;
    require(&user, Capability::EditTasks)?;

    let updated =
        task_service::update_task(&data.db, path.into_inner(), payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(updated))
}

/// DELETE /api/tasks/{id}
pub async fn delete_task(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let user = current_user(&req)?;
    require(&user, Capability::ManageTasks)?;

    let task_id = path.into_inner();
    task_service::delete_task(&data.db, task_id).await?;
    info!("task {} deleted by user {}", task_id, user.user_id);
    Ok(HttpResponse::NoContent().finish())
}
