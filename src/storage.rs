use crate::{
    Error,
    filename::{self, OriginalName},
};
use log::{debug, info, warn};
use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
};
use tempfile::NamedTempFile;

/// Hidden subdirectory that in-flight uploads stream into.
pub const STAGING_DIR: &str = ".incoming";

/// How many consecutive millisecond slots are tried before giving up on a name.
const MAX_NAME_ATTEMPTS: i64 = 1000;

/// The storage directory. Cheap to clone; handed to the router as state.
#[derive(Debug, Clone)]
pub struct Storage {
    root: Arc<Path>,
}

impl Storage {
    /// Opens the storage directory, creating it (and its staging
    /// subdirectory) if missing. Parents are not created.
    pub fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root: PathBuf = root.into();
        ensure_dir(&root)?;
        let staging = root.join(STAGING_DIR);
        ensure_dir(&staging)?;
        clear_staging(&staging)?;
        Ok(Self { root: root.into() })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates an empty staging file on the same filesystem as the stored
    /// files, so moving it into place is a rename.
    pub fn stage(&self) -> io::Result<NamedTempFile> {
        tempfile::Builder::new()
            .prefix("upload-")
            .tempfile_in(self.root.join(STAGING_DIR))
    }

    /// Moves a staged upload into the storage directory under
    /// `<epoch-ms>-<original>` and returns the generated name.
    pub async fn persist(
        &self,
        staged: NamedTempFile,
        original: &OriginalName,
    ) -> Result<String, Error> {
        let now = chrono::Utc::now().timestamp_millis();
        self.persist_at(staged, original, now).await
    }

    /// The rename never replaces an existing file: on collision the
    /// timestamp moves forward one millisecond and the rename is retried.
    async fn persist_at(
        &self,
        staged: NamedTempFile,
        original: &OriginalName,
        timestamp_ms: i64,
    ) -> Result<String, Error> {
        let root = Arc::clone(&self.root);
        let original = original.clone();
        tokio::task::spawn_blocking(move || {
            let mut staged = staged;
            for ts in timestamp_ms..timestamp_ms + MAX_NAME_ATTEMPTS {
                let name = filename::stored_name(ts, &original);
                match staged.persist_noclobber(root.join(&name)) {
                    Ok(_) => return Ok(name),
                    Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => {
                        debug!("{name} is taken, trying the next millisecond");
                        staged = err.file;
                    }
                    Err(err) => return Err(Error::Store(err.error)),
                }
            }
            Err(Error::Store(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("no free name for {original}"),
            )))
        })
        .await
        .map_err(|e| Error::Store(io::Error::other(e)))?
    }

    /// Names of the regular entries directly inside the storage directory,
    /// sorted. Directories (including staging) are skipped.
    pub async fn list(&self) -> io::Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&*self.root).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                continue;
            }
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    pub async fn remove(&self, name: &str) -> Result<(), Error> {
        let name = filename::validate_stored(name)?;
        match tokio::fs::remove_file(self.root.join(name)).await {
            Ok(()) => {
                info!("Deleted {name}");
                Ok(())
            }
            Err(e) => Err(match e.kind() {
                io::ErrorKind::NotFound => Error::NotFound,
                io::ErrorKind::PermissionDenied => Error::PermissionDenied,
                _ => Error::Delete(e),
            }),
        }
    }
}

/// Staging files only outlive their request when the process dies mid-upload.
fn clear_staging(staging: &Path) -> io::Result<()> {
    let mut removed = 0;
    for entry in std::fs::read_dir(staging)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            std::fs::remove_file(entry.path())?;
            removed += 1;
        }
    }
    if removed > 0 {
        warn!("Removed {} abandoned upload(s) from {}", removed, staging.display());
    }
    Ok(())
}

fn ensure_dir(path: &Path) -> io::Result<()> {
    match std::fs::create_dir(path) {
        Ok(()) => {
            info!("Created directory {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            if path.is_dir() {
                Ok(())
            } else {
                Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("{} exists and is not a directory", path.display()),
                ))
            }
        }
        Err(e) => Err(e),
    }
}
