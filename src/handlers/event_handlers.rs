// flow-backend/src/handlers/event_handlers.rs
use super::{ensure_references, owned};
use crate::auth_utils::AuthenticatedUser;
use crate::error_handler::ServiceError;
use crate::models::{CreateEventPayload, EventChanges, NewEvent};
use crate::storage::Storage;
use actix_web::{delete, get, patch, post, web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use validator::Validate;

/// Calendar window on `startDate`; both bounds inclusive and optional.
#[derive(Deserialize, Debug)]
pub struct EventWindow {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[get("")]
pub async fn list_events_handler(
    storage: web::Data<dyn Storage>,
    authenticated_user: AuthenticatedUser,
    window: web::Query<EventWindow>,
) -> Result<HttpResponse, ServiceError> {
    let mut events = storage.list_events(authenticated_user.id).await?;
    events.retain(|event| {
        window.from.map_or(true, |from| event.start_date >= from)
            && window.to.map_or(true, |to| event.start_date <= to)
    });

    Ok(HttpResponse::Ok().json(events))
}

#[post("")]
pub async fn create_event_handler(
    storage: web::Data<dyn Storage>,
    authenticated_user: AuthenticatedUser,
    payload: web::Json<CreateEventPayload>,
) -> Result<HttpResponse, ServiceError> {
    payload.validate()?;
    let payload = payload.into_inner();
    ensure_references(
        storage.get_ref(),
        &authenticated_user,
        payload.task_id,
        payload.project_id,
    )
    .await?;

    let event = storage
        .create_event(NewEvent {
            user_id: authenticated_user.id,
            title: payload.title,
            description: payload.description,
            start_date: payload.start_date,
            end_date: payload.end_date,
            all_day: payload.all_day.unwrap_or(false),
            task_id: payload.task_id,
            project_id: payload.project_id,
        })
        .await?;

    Ok(HttpResponse::Created().json(event))
}

#[get("/{event_id}")]
pub async fn get_event_handler(
    storage: web::Data<dyn Storage>,
    authenticated_user: AuthenticatedUser,
    event_id: web::Path<i32>,
) -> Result<HttpResponse, ServiceError> {
    let event_id = event_id.into_inner();
    let event = owned(
        storage.get_event(event_id).await?,
        &authenticated_user,
        event_id,
    )?;

    Ok(HttpResponse::Ok().json(event))
}

#[patch("/{event_id}")]
pub async fn update_event_handler(
    storage: web::Data<dyn Storage>,
    authenticated_user: AuthenticatedUser,
    event_id: web::Path<i32>,
    payload: web::Json<EventChanges>,
) -> Result<HttpResponse, ServiceError> {
    let event_id = event_id.into_inner();
    payload.validate()?;
    let current = owned(
        storage.get_event(event_id).await?,
        &authenticated_user,
        event_id,
    )?;

    let changes = payload.into_inner();
    changes.validate_against(&current).map_err(|error| {
        ServiceError::BadRequest(format!("Validation failed: {}", error))
    })?;
    ensure_references(
        storage.get_ref(),
        &authenticated_user,
        changes.task_id.flatten(),
        changes.project_id.flatten(),
    )
    .await?;

    let updated = storage.update_event(event_id, changes).await?;
    Ok(HttpResponse::Ok().json(updated))
}

#[delete("/{event_id}")]
pub async fn delete_event_handler(
    storage: web::Data<dyn Storage>,
    authenticated_user: AuthenticatedUser,
    event_id: web::Path<i32>,
) -> Result<HttpResponse, ServiceError> {
    let event_id = event_id.into_inner();
    owned(
        storage.get_event(event_id).await?,
        &authenticated_user,
        event_id,
    )?;

    storage.delete_event(event_id).await?;
    Ok(HttpResponse::NoContent().finish())
}
