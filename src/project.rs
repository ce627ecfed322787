use actix_multipart::Multipart;
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::NaiveDate;
use futures_util::StreamExt;
use log::info;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::auth::{current_user, require, Capability};
use crate::error::{AppError, AppResult};
use crate::models::project::{DocumentMeta, ProjectWrite};
use crate::project_service;

/// POST /api/projects (multipart form)
pub async fn create_project(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: Multipart,
) -> AppResult<HttpResponse> {
    let user = current_user(&req)?;
    require(&user, Capability::ManageProjects)?;

    let mut form = parse_project_form(payload, &data.config.upload_dir).await?;
    form.company_id = user.company_id;

    let created = project_service::create_project(&data.db, form).await?;
    info!("project {} created by user {}", created.project_id, user.user_id);
    Ok(HttpResponse::Created().json(created))
}

/// PUT /api/projects/{id} (multipart form). The team roster is replaced
/// in full with the submitted `teamMembers` set.
pub async fn update_project(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<i64>,
    payload: Multipart,
) -> AppResult<HttpResponse> {
    let user = current_user(&req)?;
    require(&user, Capability::ManageProjects)?;

    let mut form = parse_project_form(payload, &data.config.upload_dir).await?;
    form.company_id = user.company_id;

    let updated = project_service::update_project(&data.db, path.into_inner(), form).await?;
    Ok(HttpResponse::Ok().json(updated))
}

/// GET /api/projects/{id}
pub async fn get_project(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let user = current_user(&req)?;
    require(&user, Capability::ViewProjects)?;

    let project = project_service::project_by_id(&data.db, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(project))
}

/// GET /api/projects/company/{company_id}
pub async fn projects_by_company(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let user = current_user(&req)?;
    require(&user, Capability::ViewProjects)?;

    let company_id = path.into_inner();
    if company_id != user.company_id {
        return Err(AppError::Forbidden);
    }

    let projects = project_service::projects_by_company(&data.db, company_id).await?;
    Ok(HttpResponse::Ok().json(projects))
}

/// DELETE /api/projects/{id}
pub async fn delete_project(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let user = current_user(&req)?;
    require(&user, Capability::ManageProjects)?;

    let project_id = path.into_inner();
    project_service::delete_project(&data.db, project_id).await?;
    info!("project {} deleted by user {}", project_id, user.user_id);
    Ok(HttpResponse::NoContent().finish())
}

/// Collects the multipart fields into a [`ProjectWrite`]. Text fields are
/// matched by form name; `teamMembers` repeats once per member; a
/// `documentFile` part is written to the upload directory under a
/// uuid-prefixed name and only its metadata travels further.
async fn parse_project_form(mut payload: Multipart, upload_dir: &str) -> AppResult<ProjectWrite> {
    let mut form = ProjectWrite::default();

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| AppError::Validation(format!("malformed multipart payload: {}", e)))?;
        let disposition = field.content_disposition();
        let name = disposition.get_name().unwrap_or("").to_string();
        let file_name = disposition.get_filename().map(|f| f.to_string());

        let mut bytes: Vec<u8> = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk
                .map_err(|e| AppError::Validation(format!("failed reading field '{}': {}", name, e)))?;
            bytes.extend_from_slice(&chunk);
        }

        if name == "documentFile" {
            if let Some(original) = file_name {
                if !original.is_empty() && !bytes.is_empty() {
                    let stored_path =
                        format!("{}/{}-{}", upload_dir, Uuid::new_v4(), sanitize(&original));
                    std::fs::write(&stored_path, &bytes)?;
                    form.document = Some(DocumentMeta { file_name: original, stored_path });
                }
            }
        } else {
            let text = String::from_utf8(bytes)
                .map_err(|_| AppError::Validation(format!("field '{}' is not valid UTF-8", name)))?;
            apply_text_field(&mut form, &name, text.trim())?;
        }
    }

    if form.name.is_empty() {
        return Err(AppError::Validation("project name is required".to_string()));
    }
    Ok(form)
}

fn apply_text_field(form: &mut ProjectWrite, name: &str, value: &str) -> AppResult<()> {
    match name {
        "name" => form.name = value.to_string(),
        "description" if !value.is_empty() => form.description = Some(value.to_string()),
        "startDate" if !value.is_empty() => form.start_date = Some(parse_date(value)?),
        "endDate" if !value.is_empty() => form.end_date = Some(parse_date(value)?),
        "status" if !value.is_empty() => {
            form.status = value.parse().map_err(AppError::Validation)?;
        }
        "technologies" if !value.is_empty() => form.technologies = Some(value.to_string()),
        "teamMembers" => {
            let user_id = value
                .parse::<i64>()
                .map_err(|_| AppError::Validation(format!("invalid team member id '{}'", value)))?;
            form.team_members.push(user_id);
        }
        // Unknown or empty optional fields are ignored, like model binding.
        _ => {}
    }
    Ok(())
}

fn parse_date(value: &str) -> AppResult<NaiveDate> {
    value
        .parse::<NaiveDate>()
        .map_err(|_| AppError::Validation(format!("invalid date '{}'", value)))
}

// Stored names keep only a tame subset of the original filename.
fn sanitize(file_name: &str) -> String {
    file_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
