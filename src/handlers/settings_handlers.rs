// flow-backend/src/handlers/settings_handlers.rs
use crate::auth_utils::AuthenticatedUser;
use crate::error_handler::ServiceError;
use crate::models::SettingsChanges;
use crate::storage::Storage;
use actix_web::{get, patch, web, HttpResponse};
use validator::Validate;

// The settings row is created with defaults the first time it is read.
#[get("")]
pub async fn get_settings_handler(
    storage: web::Data<dyn Storage>,
    authenticated_user: AuthenticatedUser,
) -> Result<HttpResponse, ServiceError> {
    let settings = match storage.get_settings(authenticated_user.id).await? {
        Some(settings) => settings,
        None => {
            storage
                .update_settings(authenticated_user.id, SettingsChanges::default())
                .await?
        }
    };

    Ok(HttpResponse::Ok().json(settings))
}

#[patch("")]
pub async fn update_settings_handler(
    storage: web::Data<dyn Storage>,
    authenticated_user: AuthenticatedUser,
    payload: web::Json<SettingsChanges>,
) -> Result<HttpResponse, ServiceError> {
    payload.validate()?;

    let settings = storage
        .update_settings(authenticated_user.id, payload.into_inner())
        .await?;
    log::info!("User {} updated settings", authenticated_user.id);

    Ok(HttpResponse::Ok().json(settings))
}
