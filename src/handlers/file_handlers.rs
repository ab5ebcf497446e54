// flow-backend/src/handlers/file_handlers.rs
use super::{ensure_references, owned};
use crate::auth_utils::AuthenticatedUser;
use crate::error_handler::ServiceError;
use crate::models::{CreateFilePayload, NewFile, UploadFilePayload};
use crate::storage::Storage;
use actix_web::{delete, get, post, web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use validator::Validate;

const DEFAULT_UPLOAD_FILENAME: &str = "uploaded_file.txt";
const DEFAULT_UPLOAD_SIZE: i64 = 1024;
const DEFAULT_UPLOAD_TYPE: &str = "text/plain";

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct FileQueryParams {
    pub task_id: Option<i32>,
    pub project_id: Option<i32>,
}

#[get("")]
pub async fn list_files_handler(
    storage: web::Data<dyn Storage>,
    authenticated_user: AuthenticatedUser,
    query: web::Query<FileQueryParams>,
) -> Result<HttpResponse, ServiceError> {
    let mut files = storage.list_files(authenticated_user.id).await?;
    files.retain(|file| {
        query.task_id.map_or(true, |id| file.task_id == Some(id))
            && query.project_id.map_or(true, |id| file.project_id == Some(id))
    });

    Ok(HttpResponse::Ok().json(files))
}

#[post("")]
pub async fn create_file_handler(
    storage: web::Data<dyn Storage>,
    authenticated_user: AuthenticatedUser,
    payload: web::Json<CreateFilePayload>,
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

    let file = storage
        .create_file(NewFile {
            user_id: authenticated_user.id,
            task_id: payload.task_id,
            project_id: payload.project_id,
            filename: payload.filename,
            path: payload.path,
            size: payload.size,
            mime_type: payload.mime_type,
            uploaded_at: Utc::now(),
        })
        .await?;

    Ok(HttpResponse::Created().json(file))
}

/// An empty body takes every default; anything else must be a valid payload.
fn parse_upload_body(body: &[u8]) -> Result<UploadFilePayload, ServiceError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(UploadFilePayload::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ServiceError::BadRequest(format!("Invalid JSON body: {}", e)))
}

/// Simulated upload: no bytes are stored, only a metadata record with a
/// generated path.
#[post("/upload")]
pub async fn upload_file_handler(
    storage: web::Data<dyn Storage>,
    authenticated_user: AuthenticatedUser,
    body: web::Bytes,
) -> Result<HttpResponse, ServiceError> {
    let payload = parse_upload_body(&body)?;
    payload.validate()?;
    ensure_references(
        storage.get_ref(),
        &authenticated_user,
        payload.task_id,
        payload.project_id,
    )
    .await?;

    let now = Utc::now();
    let filename = payload
        .filename
        .unwrap_or_else(|| DEFAULT_UPLOAD_FILENAME.to_string());
    let path = format!("/uploads/{}_{}", now.timestamp_millis(), filename);

    let file = storage
        .create_file(NewFile {
            user_id: authenticated_user.id,
            task_id: payload.task_id,
            project_id: payload.project_id,
            filename,
            path,
            size: payload.size.unwrap_or(DEFAULT_UPLOAD_SIZE),
            mime_type: payload
                .mime_type
                .unwrap_or_else(|| DEFAULT_UPLOAD_TYPE.to_string()),
            uploaded_at: now,
        })
        .await?;
    log::info!(
        "User {} uploaded file {} to {}",
        authenticated_user.id,
        file.id,
        file.path
    );

    Ok(HttpResponse::Created().json(file))
}

#[get("/{file_id}")]
pub async fn get_file_handler(
    storage: web::Data<dyn Storage>,
    authenticated_user: AuthenticatedUser,
    file_id: web::Path<i32>,
) -> Result<HttpResponse, ServiceError> {
    let file_id = file_id.into_inner();
    let file = owned(storage.get_file(file_id).await?, &authenticated_user, file_id)?;

    Ok(HttpResponse::Ok().json(file))
}

#[delete("/{file_id}")]
pub async fn delete_file_handler(
    storage: web::Data<dyn Storage>,
    authenticated_user: AuthenticatedUser,
    file_id: web::Path<i32>,
) -> Result<HttpResponse, ServiceError> {
    let file_id = file_id.into_inner();
    owned(storage.get_file(file_id).await?, &authenticated_user, file_id)?;

    storage.delete_file(file_id).await?;
    Ok(HttpResponse::NoContent().finish())
}
