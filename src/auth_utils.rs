// flow-backend/src/auth_utils.rs
use crate::error_handler::ServiceError;
use actix_web::cookie::{Cookie, SameSite};
use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use futures_util::future::{err, ok, Ready};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "flow_session";

/// Server-side sessions: opaque random id -> user id.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, i32>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a session for `user_id` and returns its id.
    pub fn create(&self, user_id: i32) -> String {
        let session_id = Uuid::new_v4().to_string();
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session_id.clone(), user_id);
        session_id
    }

    pub fn user_for(&self, session_id: &str) -> Option<i32> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .copied()
    }

    pub fn destroy(&self, session_id: &str) -> Option<i32> {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session_id)
    }
}

pub fn session_cookie(session_id: String, secure: bool) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, session_id)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .finish()
}

pub fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    cookie.make_removal();
    cookie
}

pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes()).map_err(|e| {
        log::error!("Failed to encode password salt: {}", e);
        ServiceError::InternalServerError("Failed to hash password".to_string())
    })?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            log::error!("Failed to hash password: {}", e);
            ServiceError::InternalServerError("Failed to hash password".to_string())
        })
}

/// False for a wrong password and for a malformed stored hash.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            log::error!("Stored password hash is malformed: {}", e);
            false
        }
    }
}

/// The user behind the request's session cookie. Extracting it is what
/// gates a route: without a valid session the handler never runs and the
/// client gets a 401.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
    pub id: i32,
}

impl FromRequest for AuthenticatedUser {
    type Error = ServiceError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let Some(sessions) = req.app_data::<web::Data<SessionStore>>() else {
            log::error!("SessionStore is missing from app data");
            return err(ServiceError::InternalServerError(
                "Session store is not configured".to_string(),
            ));
        };

        let Some(cookie) = req.cookie(SESSION_COOKIE) else {
            log::debug!("No session cookie on {} {}", req.method(), req.path());
            return err(ServiceError::Unauthorized("Not authenticated".to_string()));
        };

        match sessions.user_for(cookie.value()) {
            Some(user_id) => ok(AuthenticatedUser { id: user_id }),
            None => {
                log::warn!("Rejected unknown or expired session id");
                err(ServiceError::Unauthorized(
                    "Session expired or invalid".to_string(),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("hunter22").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("hunter22", &hash));
        assert!(!verify_password("hunter23", &hash));
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!verify_password("password", "plaintext-password"));
    }

    #[test]
    fn destroyed_sessions_no_longer_resolve() {
        let store = SessionStore::new();
        let sid = store.create(42);
        assert_eq!(store.user_for(&sid), Some(42));
        assert_eq!(store.destroy(&sid), Some(42));
        assert_eq!(store.user_for(&sid), None);
    }

    #[actix_web::test]
    async fn extractor_requires_a_known_session() {
        let store = web::Data::new(SessionStore::new());
        let sid = store.create(7);

        let req = TestRequest::default()
            .app_data(store.clone())
            .cookie(Cookie::new(SESSION_COOKIE, sid))
            .to_http_request();
        let user = AuthenticatedUser::extract(&req).await.unwrap();
        assert_eq!(user.id, 7);

        let anonymous = TestRequest::default()
            .app_data(store.clone())
            .to_http_request();
        assert!(matches!(
            AuthenticatedUser::extract(&anonymous).await,
            Err(ServiceError::Unauthorized(_))
        ));

        let forged = TestRequest::default()
            .app_data(store)
            .cookie(Cookie::new(SESSION_COOKIE, "not-a-session"))
            .to_http_request();
        assert!(matches!(
            AuthenticatedUser::extract(&forged).await,
            Err(ServiceError::Unauthorized(_))
        ));
    }
}
