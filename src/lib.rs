// flow-backend/src/lib.rs
pub mod analytics;
pub mod auth_utils;
pub mod config;
pub mod db;
pub mod error_handler;
pub mod handlers;
pub mod models;
pub mod schema;
pub mod spotify;
pub mod storage;

use actix_web::{error, web, HttpRequest, HttpResponse};
use error_handler::ServiceError;
use handlers::{
    analytics_handlers, auth_handlers, event_handlers, file_handlers, project_handlers,
    settings_handlers, spotify_handlers, task_handlers, time_entry_handlers, track_handlers,
};
use storage::Storage;

async fn health_check_handler(
    storage: web::Data<dyn Storage>,
) -> Result<HttpResponse, ServiceError> {
    match storage.ping().await {
        Ok(()) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "status": "healthy",
            "backend": storage.backend_name()
        }))),
        Err(e) => {
            log::error!("Storage health check failed: {}", e);
            Err(ServiceError::InternalServerError(
                "Failed to reach storage backend".to_string(),
            ))
        }
    }
}

fn json_error(err: error::JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ServiceError::BadRequest(format!("Invalid JSON body: {}", err)).into()
}

fn query_error(err: error::QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ServiceError::BadRequest(format!("Invalid query string: {}", err)).into()
}

fn path_error(err: error::PathError, _req: &HttpRequest) -> actix_web::Error {
    ServiceError::BadRequest(format!("Invalid path parameter: {}", err)).into()
}

/// Registers every route and the extractor error handlers.
///
/// Expects `web::Data<dyn Storage>`, `web::Data<SessionStore>`,
/// `web::Data<AppConfig>` and `web::Data<MusicPlayer>` to be registered on
/// the app.
pub fn configure_app(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .app_data(web::QueryConfig::default().error_handler(query_error))
        .app_data(web::PathConfig::default().error_handler(path_error))
        .service(web::resource("/health").route(web::get().to(health_check_handler)))
        .service(
            web::scope("/api")
                .service(auth_handlers::register_handler)
                .service(auth_handlers::login_handler)
                .service(auth_handlers::logout_handler)
                .service(auth_handlers::current_user_handler)
                .service(auth_handlers::current_user_me_handler)
                .service(
                    web::scope("/projects")
                        .service(project_handlers::create_project_handler)
                        .service(project_handlers::list_projects_handler)
                        .service(project_handlers::get_project_handler)
                        .service(project_handlers::list_project_tasks_handler)
                        .service(project_handlers::list_project_time_entries_handler)
                        .service(project_handlers::list_project_files_handler)
                        .service(project_handlers::update_project_handler)
                        .service(project_handlers::delete_project_handler),
                )
                .service(
                    web::scope("/tasks")
                        .service(task_handlers::create_task_handler)
                        .service(task_handlers::list_tasks_handler)
                        .service(task_handlers::get_task_handler)
                        .service(task_handlers::list_task_time_entries_handler)
                        .service(task_handlers::list_task_files_handler)
                        .service(task_handlers::update_task_handler)
                        .service(task_handlers::delete_task_handler),
                )
                .service(
                    // `/current` must be registered before `/{entry_id}`.
                    web::scope("/time-entries")
                        .service(time_entry_handlers::current_time_entry_handler)
                        .service(time_entry_handlers::create_time_entry_handler)
                        .service(time_entry_handlers::list_time_entries_handler)
                        .service(time_entry_handlers::get_time_entry_handler)
                        .service(time_entry_handlers::update_time_entry_handler)
                        .service(time_entry_handlers::delete_time_entry_handler),
                )
                .service(
                    web::scope("/files")
                        .service(file_handlers::upload_file_handler)
                        .service(file_handlers::list_files_handler)
                        .service(file_handlers::create_file_handler)
                        .service(file_handlers::get_file_handler)
                        .service(file_handlers::delete_file_handler),
                )
                .service(
                    web::scope("/events")
                        .service(event_handlers::list_events_handler)
                        .service(event_handlers::create_event_handler)
                        .service(event_handlers::get_event_handler)
                        .service(event_handlers::update_event_handler)
                        .service(event_handlers::delete_event_handler),
                )
                .service(
                    web::scope("/tracks")
                        .service(track_handlers::list_tracks_handler)
                        .service(track_handlers::create_track_handler)
                        .service(track_handlers::get_track_handler)
                        .service(track_handlers::delete_track_handler),
                )
                .service(
                    web::scope("/settings")
                        .service(settings_handlers::get_settings_handler)
                        .service(settings_handlers::update_settings_handler),
                )
                .service(
                    web::scope("/analytics")
                        .service(analytics_handlers::get_summary_handler)
                        .service(analytics_handlers::get_time_by_project_handler)
                        .service(analytics_handlers::get_productivity_trend_handler),
                )
                .service(
                    web::scope("/spotify")
                        .service(spotify_handlers::status_handler)
                        .service(spotify_handlers::connect_handler)
                        .service(spotify_handlers::callback_handler)
                        .service(spotify_handlers::current_track_handler)
                        .service(spotify_handlers::play_handler)
                        .service(spotify_handlers::pause_handler)
                        .service(spotify_handlers::next_handler)
                        .service(spotify_handlers::previous_handler)
                        .service(spotify_handlers::volume_handler)
                        .service(spotify_handlers::disconnect_handler),
                ),
        );
}
