use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use log::error;
use serde_json::json;
use std::io;

/// Everything a request can fail with. The `Display` text is what the
/// client sees in the `error` field of the response body.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("No file uploaded")]
    NoFile,
    #[error("Only one file may be uploaded")]
    MultipleFiles,
    #[error("Malformed multipart body")]
    Multipart(#[from] multer::Error),
    #[error("Invalid file name")]
    InvalidName,
    #[error("File not found")]
    NotFound,
    #[error("Permission denied")]
    PermissionDenied,
    #[error("Failed to list files")]
    List(#[source] io::Error),
    #[error("Failed to store file")]
    Store(#[source] io::Error),
    #[error("Failed to delete file")]
    Delete(#[source] io::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::NoFile | Error::MultipleFiles | Error::Multipart(_) | Error::InvalidName => {
                StatusCode::BAD_REQUEST
            }
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::PermissionDenied => StatusCode::FORBIDDEN,
            Error::List(_) | Error::Store(_) | Error::Delete(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            match std::error::Error::source(&self) {
                Some(source) => error!("{self}: {source}"),
                None => error!("{self}"),
            }
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
