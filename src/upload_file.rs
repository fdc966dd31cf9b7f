use crate::{Error, OriginalName, Storage};
use axum::{
    extract::{FromRef, FromRequest, Request},
    http::header,
};
use log::debug;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;

/// Name of the multipart field carrying the upload.
pub const FILE_FIELD: &str = "file";

/// A single file received through a `multipart/form-data` request, already
/// written to the staging area of [`Storage`].
///
/// Extracting it reads the whole body. Text fields and file parts under any
/// other name are skipped; a second `file` part is rejected. Dropping the
/// value without calling [`UploadFile::persist`] discards the staged bytes.
#[derive(Debug)]
pub struct UploadFile {
    /// Client-supplied name, sanitized.
    pub name: OriginalName,
    pub content_type: String,
    pub size: u64,
    staged: NamedTempFile,
}

impl UploadFile {
    /// Moves the staged bytes into the storage directory, returning the
    /// generated file name.
    pub async fn persist(self, storage: &Storage) -> Result<String, Error> {
        storage.persist(self.staged, &self.name).await
    }
}

impl<S> FromRequest<S> for UploadFile
where
    S: Send + Sync,
    Storage: FromRef<S>,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let storage = Storage::from_ref(state);

        let boundary = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|ct| ct.to_str().ok())
            .and_then(|ct| {
                multer::parse_boundary(ct)
                    .map_err(|e| debug!("Not a multipart upload: {}", e))
                    .ok()
            })
            .ok_or(Error::NoFile)?;
        let mut multipart = multer::Multipart::new(req.into_body().into_data_stream(), boundary);

        let mut upload: Option<UploadFile> = None;
        while let Some(mut field) = multipart.next_field().await.map_err(|e| {
            debug!("Failed to read multipart field: {}", e);
            Error::from(e)
        })? {
            if field.name() != Some(FILE_FIELD) {
                debug!("Skipping field {:?}", field.name());
                continue;
            }
            // Browsers send an empty file name when nothing was selected.
            let Some(original) = field.file_name().filter(|n| !n.is_empty()) else {
                debug!("Field {FILE_FIELD:?} carries no file");
                continue;
            };
            if upload.is_some() {
                return Err(Error::MultipleFiles);
            }

            let name = OriginalName::parse(original)?;
            let content_type = field
                .content_type()
                .map(|ct| ct.to_string())
                .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string());

            let staged = storage.stage().map_err(Error::Store)?;
            debug!("Staging {} at {:?}", name, staged.path());
            let mut file = tokio::fs::OpenOptions::new()
                .write(true)
                .open(staged.path())
                .await
                .map_err(Error::Store)?;

            let mut size = 0;
            while let Some(chunk) = field.chunk().await? {
                size += chunk.len() as u64;
                debug!("Writing chunk of size {} bytes", chunk.len());
                file.write_all(&chunk).await.map_err(Error::Store)?;
            }
            file.sync_all().await.map_err(Error::Store)?;
            debug!("Total bytes written to {}: {}", name, size);

            upload = Some(UploadFile {
                name,
                content_type,
                size,
                staged,
            });
        }

        upload.ok_or(Error::NoFile)
    }
}
