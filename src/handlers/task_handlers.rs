// flow-backend/src/handlers/task_handlers.rs
use super::{ensure_references, owned};
use crate::auth_utils::AuthenticatedUser;
use crate::error_handler::ServiceError;
use crate::models::{CreateTaskPayload, NewTask, TaskChanges, DEFAULT_TASK_STATUS};
use crate::storage::Storage;
use actix_web::{delete, get, patch, post, web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use validator::Validate;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TaskQueryParams {
    pub project_id: Option<i32>,
    pub status: Option<String>,
}

#[post("")]
pub async fn create_task_handler(
    storage: web::Data<dyn Storage>,
    authenticated_user: AuthenticatedUser,
    payload: web::Json<CreateTaskPayload>,
) -> Result<HttpResponse, ServiceError> {
    payload.validate()?;
    let payload = payload.into_inner();
    ensure_references(
        storage.get_ref(),
        &authenticated_user,
        None,
        payload.project_id,
    )
    .await?;

    let new_task = NewTask {
        user_id: authenticated_user.id,
        project_id: payload.project_id,
        title: payload.title,
        description: payload.description,
        status: payload
            .status
            .unwrap_or_else(|| DEFAULT_TASK_STATUS.to_string()),
        estimated_time: payload.estimated_time,
        progress: payload.progress.unwrap_or(0),
        due_date: payload.due_date,
        created_at: Utc::now(),
    };

    let task = storage.create_task(new_task).await?;
    log::info!("User {} created task {}", authenticated_user.id, task.id);

    Ok(HttpResponse::Created().json(task))
}

#[get("")]
pub async fn list_tasks_handler(
    storage: web::Data<dyn Storage>,
    authenticated_user: AuthenticatedUser,
    query: web::Query<TaskQueryParams>,
) -> Result<HttpResponse, ServiceError> {
    let mut tasks = storage.list_tasks(authenticated_user.id).await?;

    if let Some(project_id) = query.project_id {
        tasks.retain(|task| task.project_id == Some(project_id));
    }
    if let Some(status) = &query.status {
        tasks.retain(|task| &task.status == status);
    }

    Ok(HttpResponse::Ok().json(tasks))
}

#[get("/{task_id}")]
pub async fn get_task_handler(
    storage: web::Data<dyn Storage>,
    authenticated_user: AuthenticatedUser,
    task_id: web::Path<i32>,
) -> Result<HttpResponse, ServiceError> {
    let task_id = task_id.into_inner();
    let task = owned(storage.get_task(task_id).await?, &authenticated_user, task_id)?;

    Ok(HttpResponse::Ok().json(task))
}

#[get("/{task_id}/time-entries")]
pub async fn list_task_time_entries_handler(
    storage: web::Data<dyn Storage>,
    authenticated_user: AuthenticatedUser,
    task_id: web::Path<i32>,
) -> Result<HttpResponse, ServiceError> {
    let task_id = task_id.into_inner();
    owned(storage.get_task(task_id).await?, &authenticated_user, task_id)?;

    let entries = storage.list_time_entries_by_task(task_id).await?;
    Ok(HttpResponse::Ok().json(entries))
}

#[get("/{task_id}/files")]
pub async fn list_task_files_handler(
    storage: web::Data<dyn Storage>,
    authenticated_user: AuthenticatedUser,
    task_id: web::Path<i32>,
) -> Result<HttpResponse, ServiceError> {
    let task_id = task_id.into_inner();
    owned(storage.get_task(task_id).await?, &authenticated_user, task_id)?;

    let files = storage.list_files_by_task(task_id).await?;
    Ok(HttpResponse::Ok().json(files))
}

#[patch("/{task_id}")]
pub async fn update_task_handler(
    storage: web::Data<dyn Storage>,
    authenticated_user: AuthenticatedUser,
    task_id: web::Path<i32>,
    payload: web::Json<TaskChanges>,
) -> Result<HttpResponse, ServiceError> {
    let task_id = task_id.into_inner();
    payload.validate()?;
    owned(storage.get_task(task_id).await?, &authenticated_user, task_id)?;

    let changes = payload.into_inner();
    ensure_references(
        storage.get_ref(),
        &authenticated_user,
        None,
        changes.project_id.flatten(),
    )
    .await?;

    let updated = storage.update_task(task_id, changes).await?;
    Ok(HttpResponse::Ok().json(updated))
}

#[delete("/{task_id}")]
pub async fn delete_task_handler(
    storage: web::Data<dyn Storage>,
    authenticated_user: AuthenticatedUser,
    task_id: web::Path<i32>,
) -> Result<HttpResponse, ServiceError> {
    let task_id = task_id.into_inner();
    owned(storage.get_task(task_id).await?, &authenticated_user, task_id)?;

    storage.delete_task(task_id).await?;
    log::info!(
        "User {} deleted task {} with its time entries",
        authenticated_user.id,
        task_id
    );

    Ok(HttpResponse::NoContent().finish())
}
