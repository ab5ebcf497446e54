#![allow(dead_code)]

use actix_web::body::BoxBody;
use actix_web::cookie::Cookie;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{web, App};
use chrono::Utc;
use flow_backend::auth_utils::{hash_password, SessionStore, SESSION_COOKIE};
use flow_backend::config::AppConfig;
use flow_backend::configure_app;
use flow_backend::spotify::MusicPlayer;
use flow_backend::storage::{seed, MemStorage, Storage};
use std::collections::HashMap;
use std::sync::Arc;

pub struct TestContext {
    pub storage: Arc<MemStorage>,
    pub sessions: web::Data<SessionStore>,
    pub player: web::Data<MusicPlayer>,
    pub config: web::Data<AppConfig>,
}

impl TestContext {
    pub fn new() -> Self {
        let config = AppConfig::from_lookup(|_| None).expect("default config is valid");
        TestContext {
            storage: Arc::new(MemStorage::new()),
            sessions: web::Data::new(SessionStore::new()),
            player: web::Data::new(MusicPlayer::new(config.spotify.clone())),
            config: web::Data::new(config),
        }
    }

    pub fn with_env(pairs: &[(&str, &str)]) -> Self {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let config = AppConfig::from_lookup(|key| map.get(key).cloned()).expect("valid config");
        TestContext {
            player: web::Data::new(MusicPlayer::new(config.spotify.clone())),
            config: web::Data::new(config),
            ..TestContext::new()
        }
    }

    pub async fn with_demo_data() -> Self {
        let context = TestContext::new();
        let hash = hash_password(seed::DEMO_PASSWORD).expect("hashing works");
        seed::seed_demo_data(context.storage.as_ref(), hash, Utc::now())
            .await
            .expect("demo data seeds");
        context
    }

    pub fn app(
        &self,
    ) -> App<
        impl ServiceFactory<
            ServiceRequest,
            Config = (),
            Response = ServiceResponse<BoxBody>,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        let storage: Arc<dyn Storage> = self.storage.clone();
        App::new()
            .app_data(web::Data::from(storage))
            .app_data(self.sessions.clone())
            .app_data(self.player.clone())
            .app_data(self.config.clone())
            .configure(configure_app)
    }
}

pub fn session_cookie_of<B>(resp: &ServiceResponse<B>) -> Cookie<'static> {
    resp.response()
        .cookies()
        .find(|c| c.name() == SESSION_COOKIE)
        .map(|c| c.into_owned())
        .expect("response sets a session cookie")
}

/// Registers `$username` and evaluates to the session cookie.
macro_rules! register {
    ($app:expr, $username:expr) => {{
        let req = actix_web::test::TestRequest::post()
            .uri("/api/register")
            .set_json(serde_json::json!({
                "username": $username,
                "password": "correct-horse",
            }))
            .to_request();
        let resp = actix_web::test::call_service(&$app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::CREATED);
        $crate::common::session_cookie_of(&resp)
    }};
}

/// Sends a request with the given session cookie and evaluates to
/// `(status, json body)`. The body is `Null` when empty.
macro_rules! call {
    ($app:expr, $cookie:expr, $method:ident $uri:expr) => {{
        let req = actix_web::test::TestRequest::$method()
            .uri(&$uri)
            .cookie($cookie.clone())
            .to_request();
        $crate::common::read(actix_web::test::call_service(&$app, req).await).await
    }};
    ($app:expr, $cookie:expr, $method:ident $uri:expr, $body:expr) => {{
        let req = actix_web::test::TestRequest::$method()
            .uri(&$uri)
            .cookie($cookie.clone())
            .set_json($body)
            .to_request();
        $crate::common::read(actix_web::test::call_service(&$app, req).await).await
    }};
}

pub async fn read(
    resp: ServiceResponse<BoxBody>,
) -> (actix_web::http::StatusCode, serde_json::Value) {
    let status = resp.status();
    let bytes = actix_web::test::read_body(resp).await;
    let body = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("response body is JSON")
    };
    (status, body)
}
