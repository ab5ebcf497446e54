// flow-backend/src/handlers/time_entry_handlers.rs
use super::{ensure_references, owned};
use crate::auth_utils::AuthenticatedUser;
use crate::error_handler::ServiceError;
use crate::models::{elapsed_seconds, CreateTimeEntryPayload, NewTimeEntry, TimeEntryChanges};
use crate::storage::Storage;
use actix_web::{delete, get, patch, post, web, HttpResponse, Result as ActixResult};
use chrono::{DateTime, Utc};
use validator::Validate;

// DTO for listing query parameters
#[derive(serde::Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ListTimeEntriesQuery {
    pub task_id: Option<i32>,
    pub project_id: Option<i32>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
}

// === POST /time-entries ===
// Starting an entry closes whatever the user was tracking before.
#[post("")]
pub async fn create_time_entry_handler(
    storage: web::Data<dyn Storage>,
    authenticated_user: AuthenticatedUser,
    payload: web::Json<CreateTimeEntryPayload>,
) -> ActixResult<HttpResponse, ServiceError> {
    let user_id = authenticated_user.id;
    log::info!(
        "User {} creating time entry with payload: {:?}",
        user_id,
        payload.0
    );

    payload.validate()?;
    let payload = payload.into_inner();
    ensure_references(
        storage.get_ref(),
        &authenticated_user,
        payload.task_id,
        payload.project_id,
    )
    .await?;

    let mut duration = payload.duration;
    if let Some(end) = payload.end_time {
        if duration.is_none() && end > payload.start_time {
            duration = Some(elapsed_seconds(payload.start_time, end));
        }
    }

    let new_entry = NewTimeEntry {
        user_id,
        task_id: payload.task_id,
        project_id: payload.project_id,
        start_time: payload.start_time,
        end_time: payload.end_time,
        duration,
        description: payload.description,
    };

    let created_entry = storage.start_time_entry(new_entry).await?;
    log::info!("Time entry {} created for user {}", created_entry.id, user_id);

    Ok(HttpResponse::Created().json(created_entry))
}

// === GET /time-entries ===
#[get("")]
pub async fn list_time_entries_handler(
    storage: web::Data<dyn Storage>,
    authenticated_user: AuthenticatedUser,
    query_params: web::Query<ListTimeEntriesQuery>,
) -> ActixResult<HttpResponse, ServiceError> {
    let query = query_params.into_inner();
    log::debug!(
        "User {} listing time entries with options: {:?}",
        authenticated_user.id,
        query
    );

    let mut entries = storage.list_time_entries(authenticated_user.id).await?;
    entries.retain(|entry| {
        query.task_id.map_or(true, |id| entry.task_id == Some(id))
            && query.project_id.map_or(true, |id| entry.project_id == Some(id))
            && query.date_from.map_or(true, |from| entry.start_time >= from)
            && query.date_to.map_or(true, |to| entry.start_time <= to)
    });

    Ok(HttpResponse::Ok().json(entries))
}

// === GET /time-entries/current ===
#[get("/current")]
pub async fn current_time_entry_handler(
    storage: web::Data<dyn Storage>,
    authenticated_user: AuthenticatedUser,
) -> ActixResult<HttpResponse, ServiceError> {
    match storage.current_time_entry(authenticated_user.id).await? {
        Some(entry) => Ok(HttpResponse::Ok().json(entry)),
        None => Err(ServiceError::NotFound("No active time entry".to_string())),
    }
}

// === GET /time-entries/{entry_id} ===
#[get("/{entry_id}")]
pub async fn get_time_entry_handler(
    storage: web::Data<dyn Storage>,
    authenticated_user: AuthenticatedUser,
    entry_id: web::Path<i32>,
) -> ActixResult<HttpResponse, ServiceError> {
    let entry_id = entry_id.into_inner();
    let entry = owned(
        storage.get_time_entry(entry_id).await?,
        &authenticated_user,
        entry_id,
    )?;

    Ok(HttpResponse::Ok().json(entry))
}

// === PATCH /time-entries/{entry_id} ===
#[patch("/{entry_id}")]
pub async fn update_time_entry_handler(
    storage: web::Data<dyn Storage>,
    authenticated_user: AuthenticatedUser,
    entry_id: web::Path<i32>,
    payload: web::Json<TimeEntryChanges>,
) -> ActixResult<HttpResponse, ServiceError> {
    let entry_id = entry_id.into_inner();
    payload.validate()?;
    owned(
        storage.get_time_entry(entry_id).await?,
        &authenticated_user,
        entry_id,
    )?;

    let changes = payload.into_inner();
    ensure_references(
        storage.get_ref(),
        &authenticated_user,
        changes.task_id.flatten(),
        changes.project_id.flatten(),
    )
    .await?;

    // Patches store times as sent; the duration is never recomputed here.
    let updated = storage.update_time_entry(entry_id, changes).await?;
    log::info!(
        "User {} updated time entry {}",
        authenticated_user.id,
        updated.id
    );

    Ok(HttpResponse::Ok().json(updated))
}

// === DELETE /time-entries/{entry_id} ===
#[delete("/{entry_id}")]
pub async fn delete_time_entry_handler(
    storage: web::Data<dyn Storage>,
    authenticated_user: AuthenticatedUser,
    entry_id: web::Path<i32>,
) -> ActixResult<HttpResponse, ServiceError> {
    let entry_id = entry_id.into_inner();
    owned(
        storage.get_time_entry(entry_id).await?,
        &authenticated_user,
        entry_id,
    )?;

    storage.delete_time_entry(entry_id).await?;
    Ok(HttpResponse::NoContent().finish())
}
