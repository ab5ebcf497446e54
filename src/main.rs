// flow-backend/src/main.rs
use actix_cors::Cors;
use actix_web::{http::header, middleware::Logger, web, App, HttpServer};
use flow_backend::auth_utils::{hash_password, SessionStore};
use flow_backend::config::{AppConfig, StorageBackend};
use flow_backend::spotify::MusicPlayer;
use flow_backend::storage::{seed, MemStorage, PgStorage, Storage};
use flow_backend::{configure_app, db};
use std::io;
use std::sync::Arc;

fn startup_error(context: &str, e: impl std::fmt::Display) -> io::Error {
    log::error!("{}: {}", context, e);
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, e))
}

async fn build_storage(config: &AppConfig) -> io::Result<Arc<dyn Storage>> {
    match (config.storage_backend, config.database_url.as_deref()) {
        (StorageBackend::Postgres, Some(database_url)) => {
            let pool = db::create_pool(database_url, config.pool_size)
                .await
                .map_err(|e| startup_error("Failed to create database connection pool", e))?;
            db::run_migrations(&pool)
                .await
                .map_err(|e| startup_error("Failed to apply database schema", e))?;
            Ok(Arc::new(PgStorage::new(pool)))
        }
        (StorageBackend::Postgres, None) => Err(startup_error(
            "Invalid configuration",
            "DATABASE_URL is required for the postgres backend",
        )),
        (StorageBackend::Memory, _) => Ok(Arc::new(MemStorage::new())),
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::init();

    if cfg!(debug_assertions) {
        match dotenvy::dotenv() {
            Ok(path) => log::info!(".env file loaded from path: {}", path.display()),
            Err(e) => log::warn!(
                "Could not load .env file: {}, using environment variables.",
                e
            ),
        }
    }

    let config = AppConfig::from_env().map_err(|e| startup_error("Invalid configuration", e))?;

    let storage = build_storage(&config).await?;
    log::info!("Using {} storage backend", storage.backend_name());

    let demo_hash = hash_password(seed::DEMO_PASSWORD)
        .map_err(|e| startup_error("Failed to hash demo password", e))?;
    seed::seed_if_empty(storage.as_ref(), demo_hash)
        .await
        .map_err(|e| startup_error("Failed to seed demo data", e))?;

    let storage_data: web::Data<dyn Storage> = web::Data::from(storage);
    let sessions = web::Data::new(SessionStore::new());
    let player = web::Data::new(MusicPlayer::new(config.spotify.clone()));
    let bind_address = (config.host.clone(), config.port);
    let config_data = web::Data::new(config);

    log::info!(
        "Flow backend starting at http://{}:{}",
        bind_address.0,
        bind_address.1
    );

    HttpServer::new(move || {
        let cors = config_data
            .frontend_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(storage_data.clone())
            .app_data(sessions.clone())
            .app_data(player.clone())
            .app_data(config_data.clone())
            .configure(configure_app)
    })
    .bind(bind_address)?
    .run()
    .await
}
