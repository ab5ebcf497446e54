// flow-backend/src/handlers/auth_handlers.rs
use crate::auth_utils::{
    hash_password, removal_cookie, session_cookie, verify_password, AuthenticatedUser,
    SessionStore, SESSION_COOKIE,
};
use crate::config::AppConfig;
use crate::error_handler::ServiceError;
use crate::models::{LoginPayload, NewUser, RegisterPayload, User};
use crate::storage::{Storage, StorageError};
use actix_web::http::StatusCode;
use actix_web::{error::BlockingError, get, post, web, HttpRequest, HttpResponse};
use validator::Validate;

const INVALID_CREDENTIALS: &str = "Invalid username or password";

fn blocking_failed(e: BlockingError) -> ServiceError {
    log::error!("Password hashing task failed: {}", e);
    ServiceError::InternalServerError("Password hashing failed".to_string())
}

fn signed_in(
    status: StatusCode,
    user: &User,
    sessions: &SessionStore,
    config: &AppConfig,
) -> HttpResponse {
    let session_id = sessions.create(user.id);
    HttpResponse::build(status)
        .cookie(session_cookie(session_id, config.session_cookie_secure))
        .json(user)
}

#[post("/register")]
pub async fn register_handler(
    storage: web::Data<dyn Storage>,
    sessions: web::Data<SessionStore>,
    config: web::Data<AppConfig>,
    payload: web::Json<RegisterPayload>,
) -> Result<HttpResponse, ServiceError> {
    payload.validate()?;
    let payload = payload.into_inner();

    if storage
        .get_user_by_username(&payload.username)
        .await?
        .is_some()
    {
        return Err(ServiceError::BadRequest("Username already exists".to_string()));
    }

    let password = payload.password;
    let password_hash = web::block(move || hash_password(&password))
        .await
        .map_err(blocking_failed)??;

    let user = storage
        .create_user(NewUser {
            username: payload.username,
            password: password_hash,
            email: payload.email,
            display_name: payload.display_name,
            avatar: payload.avatar,
        })
        .await
        .map_err(|e| match e {
            // Lost a race with a concurrent registration.
            StorageError::Conflict(_) => {
                ServiceError::BadRequest("Username already exists".to_string())
            }
            other => other.into(),
        })?;
    log::info!("Registered user {} ({})", user.id, user.username);

    Ok(signed_in(
        StatusCode::CREATED,
        &user,
        &sessions,
        &config,
    ))
}

#[post("/login")]
pub async fn login_handler(
    storage: web::Data<dyn Storage>,
    sessions: web::Data<SessionStore>,
    config: web::Data<AppConfig>,
    payload: web::Json<LoginPayload>,
) -> Result<HttpResponse, ServiceError> {
    payload.validate()?;
    let payload = payload.into_inner();

    let Some(user) = storage.get_user_by_username(&payload.username).await? else {
        log::warn!("Login attempt for unknown user '{}'", payload.username);
        return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    };

    let stored_hash = user.password.clone();
    let password = payload.password;
    let verified = web::block(move || verify_password(&password, &stored_hash))
        .await
        .map_err(blocking_failed)?;
    if !verified {
        log::warn!("Wrong password for user {}", user.id);
        return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    log::info!("User {} logged in", user.id);
    Ok(signed_in(
        StatusCode::OK,
        &user,
        &sessions,
        &config,
    ))
}

// Ungated and idempotent: an unknown or missing session is not an error.
#[post("/logout")]
pub async fn logout_handler(
    sessions: web::Data<SessionStore>,
    req: HttpRequest,
) -> Result<HttpResponse, ServiceError> {
    if let Some(cookie) = req.cookie(SESSION_COOKIE) {
        if let Some(user_id) = sessions.destroy(cookie.value()) {
            log::info!("User {} logged out", user_id);
        }
    }

    Ok(HttpResponse::NoContent().cookie(removal_cookie()).finish())
}

async fn load_current_user(
    storage: &dyn Storage,
    authenticated_user: AuthenticatedUser,
) -> Result<HttpResponse, ServiceError> {
    match storage.get_user(authenticated_user.id).await? {
        Some(user) => Ok(HttpResponse::Ok().json(user)),
        None => Err(ServiceError::Unauthorized(
            "Session expired or invalid".to_string(),
        )),
    }
}

#[get("/user")]
pub async fn current_user_handler(
    storage: web::Data<dyn Storage>,
    authenticated_user: AuthenticatedUser,
) -> Result<HttpResponse, ServiceError> {
    load_current_user(storage.get_ref(), authenticated_user).await
}

#[get("/user/me")]
pub async fn current_user_me_handler(
    storage: web::Data<dyn Storage>,
    authenticated_user: AuthenticatedUser,
) -> Result<HttpResponse, ServiceError> {
    load_current_user(storage.get_ref(), authenticated_user).await
}
