// flow-backend/src/handlers/track_handlers.rs
use super::owned;
use crate::auth_utils::AuthenticatedUser;
use crate::error_handler::ServiceError;
use crate::models::{CreateTrackPayload, NewTrack, DEFAULT_TRACK_SOURCE};
use crate::storage::Storage;
use actix_web::{delete, get, post, web, HttpResponse};
use chrono::Utc;
use validator::Validate;

#[get("")]
pub async fn list_tracks_handler(
    storage: web::Data<dyn Storage>,
    authenticated_user: AuthenticatedUser,
) -> Result<HttpResponse, ServiceError> {
    let tracks = storage.list_tracks(authenticated_user.id).await?;
    Ok(HttpResponse::Ok().json(tracks))
}

#[post("")]
pub async fn create_track_handler(
    storage: web::Data<dyn Storage>,
    authenticated_user: AuthenticatedUser,
    payload: web::Json<CreateTrackPayload>,
) -> Result<HttpResponse, ServiceError> {
    payload.validate()?;
    let payload = payload.into_inner();

    let track = storage
        .create_track(NewTrack {
            user_id: authenticated_user.id,
            track_id: payload.track_id,
            title: payload.title,
            artist: payload.artist,
            album: payload.album,
            album_cover: payload.album_cover,
            duration: payload.duration,
            source: payload
                .source
                .unwrap_or_else(|| DEFAULT_TRACK_SOURCE.to_string()),
            added_at: Utc::now(),
        })
        .await?;

    Ok(HttpResponse::Created().json(track))
}

#[get("/{track_id}")]
pub async fn get_track_handler(
    storage: web::Data<dyn Storage>,
    authenticated_user: AuthenticatedUser,
    track_id: web::Path<i32>,
) -> Result<HttpResponse, ServiceError> {
    let track_id = track_id.into_inner();
    let track = owned(
        storage.get_track(track_id).await?,
        &authenticated_user,
        track_id,
    )?;

    Ok(HttpResponse::Ok().json(track))
}

#[delete("/{track_id}")]
pub async fn delete_track_handler(
    storage: web::Data<dyn Storage>,
    authenticated_user: AuthenticatedUser,
    track_id: web::Path<i32>,
) -> Result<HttpResponse, ServiceError> {
    let track_id = track_id.into_inner();
    owned(
        storage.get_track(track_id).await?,
        &authenticated_user,
        track_id,
    )?;

    storage.delete_track(track_id).await?;
    Ok(HttpResponse::NoContent().finish())
}
