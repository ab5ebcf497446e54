// flow-backend/src/handlers/analytics_handlers.rs
use crate::analytics::{self, calculate_date_range, AnalyticsQueryPeriod};
use crate::auth_utils::AuthenticatedUser;
use crate::error_handler::ServiceError;
use crate::storage::Storage;
use actix_web::{get, web, HttpResponse, Result as ActixResult};
use chrono::Utc;

// === GET /analytics/summary ===
#[get("/summary")]
pub async fn get_summary_handler(
    storage: web::Data<dyn Storage>,
    authenticated_user: AuthenticatedUser,
) -> ActixResult<HttpResponse, ServiceError> {
    let tasks = storage.list_tasks(authenticated_user.id).await?;
    let entries = storage.list_time_entries(authenticated_user.id).await?;

    let summary = analytics::summary(&tasks, &entries, Utc::now());
    Ok(HttpResponse::Ok().json(summary))
}

// === GET /analytics/time-by-project ===
#[get("/time-by-project")]
pub async fn get_time_by_project_handler(
    storage: web::Data<dyn Storage>,
    authenticated_user: AuthenticatedUser,
    query_params: web::Query<AnalyticsQueryPeriod>,
) -> ActixResult<HttpResponse, ServiceError> {
    let user_id = authenticated_user.id;
    log::info!(
        "User {} fetching time_by_project with params: {:?}",
        user_id,
        query_params.0
    );

    let range = calculate_date_range(&query_params.0, Utc::now().date_naive())?;

    let projects = storage.list_projects(user_id).await?;
    let tasks = storage.list_tasks(user_id).await?;
    let entries = storage.list_time_entries(user_id).await?;

    let stats = analytics::time_by_project(&projects, &tasks, &entries, range);
    Ok(HttpResponse::Ok().json(stats))
}

// === GET /analytics/productivity-trend ===
#[get("/productivity-trend")]
pub async fn get_productivity_trend_handler(
    storage: web::Data<dyn Storage>,
    authenticated_user: AuthenticatedUser,
    query_params: web::Query<AnalyticsQueryPeriod>,
) -> ActixResult<HttpResponse, ServiceError> {
    let user_id = authenticated_user.id;
    log::info!(
        "User {} fetching productivity_trend with params: {:?}",
        user_id,
        query_params.0
    );

    let range = calculate_date_range(&query_params.0, Utc::now().date_naive())?;
    let entries = storage.list_time_entries(user_id).await?;

    let trend_points = analytics::productivity_trend(&entries, range);
    Ok(HttpResponse::Ok().json(trend_points))
}
