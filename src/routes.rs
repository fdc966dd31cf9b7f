use crate::{Error, Storage, UploadFile, landing::landing_page};
use axum::{
    Json, Router,
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use log::{debug, info};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use tower_http::services::ServeDir;

/// Prefix the stored files are served under.
const UPLOADS_PREFIX: &str = "/uploads";

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct UploadResponse {
    pub message: String,
    pub file: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct MessageResponse {
    pub message: String,
}

/// Builds the service:
///
/// | route                     | handler                   |
/// |---------------------------|---------------------------|
/// | `GET /`                   | landing page              |
/// | `POST /upload`            | store the `file` part     |
/// | `GET /files`              | list stored names         |
/// | `DELETE /files/{filename}`| remove a stored file      |
/// | `GET /uploads/{filename}` | serve a stored file       |
pub fn router(storage: Storage) -> Router {
    let uploads = ServeDir::new(storage.root());

    Router::new()
        .route("/", get(landing_page))
        .route("/upload", post(upload))
        .route("/files", get(list_files))
        .route("/files/{filename}", delete(delete_file))
        .nest_service(UPLOADS_PREFIX, uploads)
        .layer(middleware::from_fn(hide_dot_segments))
        .with_state(storage)
}

/// `ServeDir` publishes everything under the storage root, including the
/// staging directory. Any served path with a segment starting with `.`
/// (after percent-decoding, the way `ServeDir` reads it) is a 404.
async fn hide_dot_segments(req: Request, next: Next) -> Response {
    if let Some(rest) = req.uri().path().strip_prefix(UPLOADS_PREFIX) {
        let decoded = percent_decode_str(rest).decode_utf8_lossy();
        if decoded.split('/').any(|segment| segment.starts_with('.')) {
            debug!("Refusing to serve {}", req.uri().path());
            return StatusCode::NOT_FOUND.into_response();
        }
    }
    next.run(req).await
}

#[axum::debug_handler]
async fn upload(
    State(storage): State<Storage>,
    upload: UploadFile,
) -> Result<Json<UploadResponse>, Error> {
    let (size, content_type) = (upload.size, upload.content_type.clone());
    let file = upload.persist(&storage).await?;
    info!("Stored {} ({} bytes, {})", file, size, content_type);

    Ok(Json(UploadResponse {
        message: "File uploaded successfully".to_string(),
        file,
    }))
}

#[axum::debug_handler]
async fn list_files(State(storage): State<Storage>) -> Result<Json<Vec<String>>, Error> {
    let files = storage.list().await.map_err(Error::List)?;
    Ok(Json(files))
}

#[axum::debug_handler]
async fn delete_file(
    State(storage): State<Storage>,
    Path(filename): Path<String>,
) -> Result<Json<MessageResponse>, Error> {
    storage.remove(&filename).await?;
    Ok(Json(MessageResponse {
        message: "File deleted successfully".to_string(),
    }))
}
