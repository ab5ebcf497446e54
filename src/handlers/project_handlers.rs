// flow-backend/src/handlers/project_handlers.rs
use super::owned;
use crate::auth_utils::AuthenticatedUser;
use crate::error_handler::ServiceError;
use crate::models::{CreateProjectPayload, NewProject, ProjectChanges};
use crate::storage::Storage;
use actix_web::{delete, get, patch, post, web, HttpResponse};
use validator::Validate;

#[post("")]
pub async fn create_project_handler(
    storage: web::Data<dyn Storage>,
    authenticated_user: AuthenticatedUser,
    payload: web::Json<CreateProjectPayload>,
) -> Result<HttpResponse, ServiceError> {
    payload.validate()?;
    let payload = payload.into_inner();

    let new_project = NewProject {
        user_id: authenticated_user.id,
        name: payload.name,
        description: payload.description,
        color: payload.color,
    };

    let project = storage.create_project(new_project).await?;
    log::info!(
        "User {} created project {}",
        authenticated_user.id,
        project.id
    );

    Ok(HttpResponse::Created().json(project))
}

#[get("")]
pub async fn list_projects_handler(
    storage: web::Data<dyn Storage>,
    authenticated_user: AuthenticatedUser,
) -> Result<HttpResponse, ServiceError> {
    let projects = storage.list_projects(authenticated_user.id).await?;
    Ok(HttpResponse::Ok().json(projects))
}

#[get("/{project_id}")]
pub async fn get_project_handler(
    storage: web::Data<dyn Storage>,
    authenticated_user: AuthenticatedUser,
    project_id: web::Path<i32>,
) -> Result<HttpResponse, ServiceError> {
    let project_id = project_id.into_inner();
    let project = owned(
        storage.get_project(project_id).await?,
        &authenticated_user,
        project_id,
    )?;

    Ok(HttpResponse::Ok().json(project))
}

#[get("/{project_id}/tasks")]
pub async fn list_project_tasks_handler(
    storage: web::Data<dyn Storage>,
    authenticated_user: AuthenticatedUser,
    project_id: web::Path<i32>,
) -> Result<HttpResponse, ServiceError> {
    let project_id = project_id.into_inner();
    owned(
        storage.get_project(project_id).await?,
        &authenticated_user,
        project_id,
    )?;

    let tasks = storage.list_tasks_by_project(project_id).await?;
    Ok(HttpResponse::Ok().json(tasks))
}

#[get("/{project_id}/time-entries")]
pub async fn list_project_time_entries_handler(
    storage: web::Data<dyn Storage>,
    authenticated_user: AuthenticatedUser,
    project_id: web::Path<i32>,
) -> Result<HttpResponse, ServiceError> {
    let project_id = project_id.into_inner();
    owned(
        storage.get_project(project_id).await?,
        &authenticated_user,
        project_id,
    )?;

    let entries = storage.list_time_entries_by_project(project_id).await?;
    Ok(HttpResponse::Ok().json(entries))
}

#[get("/{project_id}/files")]
pub async fn list_project_files_handler(
    storage: web::Data<dyn Storage>,
    authenticated_user: AuthenticatedUser,
    project_id: web::Path<i32>,
) -> Result<HttpResponse, ServiceError> {
    let project_id = project_id.into_inner();
    owned(
        storage.get_project(project_id).await?,
        &authenticated_user,
        project_id,
    )?;

    let files = storage.list_files_by_project(project_id).await?;
    Ok(HttpResponse::Ok().json(files))
}

#[patch("/{project_id}")]
pub async fn update_project_handler(
    storage: web::Data<dyn Storage>,
    authenticated_user: AuthenticatedUser,
    project_id: web::Path<i32>,
    payload: web::Json<ProjectChanges>,
) -> Result<HttpResponse, ServiceError> {
    let project_id = project_id.into_inner();
    payload.validate()?;
    owned(
        storage.get_project(project_id).await?,
        &authenticated_user,
        project_id,
    )?;

    let updated = storage
        .update_project(project_id, payload.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(updated))
}

#[delete("/{project_id}")]
pub async fn delete_project_handler(
    storage: web::Data<dyn Storage>,
    authenticated_user: AuthenticatedUser,
    project_id: web::Path<i32>,
) -> Result<HttpResponse, ServiceError> {
    let project_id = project_id.into_inner();
    owned(
        storage.get_project(project_id).await?,
        &authenticated_user,
        project_id,
    )?;

    storage.delete_project(project_id).await?;
    log::info!(
        "User {} deleted project {} with its tasks and time entries",
        authenticated_user.id,
        project_id
    );

    Ok(HttpResponse::NoContent().finish())
}
