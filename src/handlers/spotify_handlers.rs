// flow-backend/src/handlers/spotify_handlers.rs
use crate::auth_utils::AuthenticatedUser;
use crate::error_handler::ServiceError;
use crate::spotify::MusicPlayer;
use actix_web::{get, post, web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize, Debug)]
pub struct CallbackQuery {
    pub state: Option<String>,
    pub code: Option<String>,
    pub error: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct VolumePayload {
    pub volume: i64,
}

#[get("/status")]
pub async fn status_handler(
    player: web::Data<MusicPlayer>,
    authenticated_user: AuthenticatedUser,
) -> Result<HttpResponse, ServiceError> {
    Ok(HttpResponse::Ok().json(player.status(authenticated_user.id)))
}

#[get("/connect")]
pub async fn connect_handler(
    player: web::Data<MusicPlayer>,
    authenticated_user: AuthenticatedUser,
) -> Result<HttpResponse, ServiceError> {
    let start = player.begin_authorization(authenticated_user.id);
    log::info!(
        "User {} started music account authorization",
        authenticated_user.id
    );
    Ok(HttpResponse::Ok().json(start))
}

// Reached by the provider redirect, so it carries no session; the state
// token identifies the user.
#[get("/callback")]
pub async fn callback_handler(
    player: web::Data<MusicPlayer>,
    query: web::Query<CallbackQuery>,
) -> Result<HttpResponse, ServiceError> {
    let query = query.into_inner();
    if query.error.is_none() && query.code.is_none() {
        return Err(ServiceError::BadRequest(
            "Missing authorization code".to_string(),
        ));
    }

    let user_id = player.complete_authorization(query.state.as_deref(), query.error.as_deref())?;
    log::info!("User {} connected a music account", user_id);

    Ok(HttpResponse::Ok().json(json!({ "connected": true })))
}

#[get("/current-track")]
pub async fn current_track_handler(
    player: web::Data<MusicPlayer>,
    authenticated_user: AuthenticatedUser,
) -> Result<HttpResponse, ServiceError> {
    let playing = player.current_track(authenticated_user.id, Utc::now())?;
    Ok(HttpResponse::Ok().json(playing))
}

#[post("/play")]
pub async fn play_handler(
    player: web::Data<MusicPlayer>,
    authenticated_user: AuthenticatedUser,
) -> Result<HttpResponse, ServiceError> {
    let playing = player.play(authenticated_user.id, Utc::now())?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "track": playing })))
}

#[post("/pause")]
pub async fn pause_handler(
    player: web::Data<MusicPlayer>,
    authenticated_user: AuthenticatedUser,
) -> Result<HttpResponse, ServiceError> {
    let playing = player.pause(authenticated_user.id, Utc::now())?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "track": playing })))
}

#[post("/next")]
pub async fn next_handler(
    player: web::Data<MusicPlayer>,
    authenticated_user: AuthenticatedUser,
) -> Result<HttpResponse, ServiceError> {
    let playing = player.next(authenticated_user.id, Utc::now())?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "track": playing })))
}

#[post("/previous")]
pub async fn previous_handler(
    player: web::Data<MusicPlayer>,
    authenticated_user: AuthenticatedUser,
) -> Result<HttpResponse, ServiceError> {
    let playing = player.previous(authenticated_user.id, Utc::now())?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "track": playing })))
}

#[post("/volume")]
pub async fn volume_handler(
    player: web::Data<MusicPlayer>,
    authenticated_user: AuthenticatedUser,
    payload: web::Json<VolumePayload>,
) -> Result<HttpResponse, ServiceError> {
    let volume = player.set_volume(authenticated_user.id, payload.volume)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "volume": volume })))
}

#[post("/disconnect")]
pub async fn disconnect_handler(
    player: web::Data<MusicPlayer>,
    authenticated_user: AuthenticatedUser,
) -> Result<HttpResponse, ServiceError> {
    player.disconnect(authenticated_user.id);
    log::info!("User {} disconnected their music account", authenticated_user.id);
    Ok(HttpResponse::Ok().json(json!({ "success": true, "connected": false })))
}
