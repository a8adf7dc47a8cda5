//! Filesystem store for lead photos.
//!
//! Photos live in a single flat directory. Each accepted upload gets a fresh
//! name of the form `lead-<unix-nanos>-<random>.<ext>`; the name is the only
//! handle a lead keeps, and the same name is the path segment that serves the
//! file back.

use bytes::Bytes;
use metrics::counter;
use rand::Rng;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

const FILENAME_PREFIX: &str = "lead-";
const ALLOWED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];
const ALLOWED_CONTENT_TYPES: [&str; 3] = ["image/jpeg", "image/jpg", "image/png"];
const MAX_NAME_ATTEMPTS: usize = 4;

#[derive(Debug, Error)]
pub enum PhotoError {
    #[error("{file_name}: only .png, .jpg and .jpeg images are allowed")]
    InvalidType { file_name: String },

    #[error("{file_name}: file exceeds the {max_bytes} byte limit")]
    TooLarge { file_name: String, max_bytes: usize },

    #[error("at most {max} photos may be attached to a lead")]
    TooMany { max: usize },

    #[error("photo {0} not found")]
    NotFound(String),

    #[error("photo storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

impl PhotoError {
    fn reason(&self) -> &'static str {
        match self {
            PhotoError::InvalidType { .. } => "invalid_type",
            PhotoError::TooLarge { .. } => "too_large",
            PhotoError::TooMany { .. } => "too_many",
            PhotoError::NotFound(_) => "not_found",
            PhotoError::Io(_) => "io",
        }
    }
}

/// Limits applied to every submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhotoPolicy {
    /// Maximum size of a single file in bytes
    pub max_bytes: usize,
    /// Maximum number of files per submission
    pub max_count: usize,
}

impl Default for PhotoPolicy {
    fn default() -> Self {
        Self {
            max_bytes: 5 * 1024 * 1024,
            max_count: 5,
        }
    }
}

/// One uploaded file as received from the client
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    /// Name the client gave the file
    pub file_name: String,
    /// Declared content type, if any
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl PhotoUpload {
    pub fn new(
        file_name: impl Into<String>,
        content_type: Option<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type,
            data: data.into(),
        }
    }

    /// Extension of the original file name, as given
    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
    }

    /// Both the extension and the declared content type name a PNG or JPEG
    pub fn has_allowed_type(&self) -> bool {
        let extension_ok = self
            .extension()
            .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        let content_type_ok = self
            .content_type
            .as_deref()
            .map(|ct| {
                let essence = ct.split(';').next().unwrap_or_default().trim();
                ALLOWED_CONTENT_TYPES.contains(&essence.to_ascii_lowercase().as_str())
            })
            .unwrap_or(false);

        extension_ok && content_type_ok
    }
}

/// Photo directory plus the URL prefix it is served under
#[derive(Debug, Clone)]
pub struct PhotoStore {
    dir: PathBuf,
    url_prefix: String,
    policy: PhotoPolicy,
}

impl PhotoStore {
    /// Opens the store, creating `dir` if it does not exist yet.
    pub async fn open(
        dir: impl Into<PathBuf>,
        url_prefix: impl Into<String>,
        policy: PhotoPolicy,
    ) -> Result<Self, PhotoError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        info!(dir = %dir.display(), "photo store ready");

        Ok(Self {
            dir,
            url_prefix: url_prefix.into(),
            policy,
        })
    }

    pub fn policy(&self) -> PhotoPolicy {
        self.policy
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Rejects a submission carrying more files than the policy allows.
    pub fn check_count(&self, count: usize) -> Result<(), PhotoError> {
        if count > self.policy.max_count {
            return Err(self.rejected(PhotoError::TooMany {
                max: self.policy.max_count,
            }));
        }
        Ok(())
    }

    /// Type and size checks for a single upload; nothing is written.
    pub fn check(&self, upload: &PhotoUpload) -> Result<(), PhotoError> {
        if !upload.has_allowed_type() {
            return Err(self.rejected(PhotoError::InvalidType {
                file_name: upload.file_name.clone(),
            }));
        }

        if upload.data.len() > self.policy.max_bytes {
            return Err(self.rejected(PhotoError::TooLarge {
                file_name: upload.file_name.clone(),
                max_bytes: self.policy.max_bytes,
            }));
        }

        Ok(())
    }

    /// Validates and writes a single upload, returning its stored filename.
    #[instrument(skip(self, upload), fields(file_name = %upload.file_name, size = upload.data.len()))]
    pub async fn accept(&self, upload: &PhotoUpload) -> Result<String, PhotoError> {
        self.check(upload)?;
        self.write_new(upload).await
    }

    /// Stores a whole submission or nothing.
    ///
    /// Every upload is checked before the first byte is written. If a write
    /// fails part way, the files already written for this batch are removed.
    #[instrument(skip(self, uploads), fields(count = uploads.len()))]
    pub async fn accept_all(&self, uploads: &[PhotoUpload]) -> Result<Vec<String>, PhotoError> {
        self.check_count(uploads.len())?;
        for upload in uploads {
            self.check(upload)?;
        }

        let mut stored = Vec::with_capacity(uploads.len());
        for upload in uploads {
            match self.write_new(upload).await {
                Ok(name) => stored.push(name),
                Err(err) => {
                    warn!(error = %err, written = stored.len(), "photo batch failed; removing partial writes");
                    self.discard(&stored).await;
                    return Err(err);
                }
            }
        }

        Ok(stored)
    }

    /// Public URL a stored photo is served under
    pub fn url_for(&self, filename: &str) -> String {
        format!("{}/{}", self.url_prefix, filename)
    }

    /// Reads back the bytes of a stored photo.
    pub async fn serve(&self, filename: &str) -> Result<Vec<u8>, PhotoError> {
        let path = self
            .resolve(filename)
            .ok_or_else(|| PhotoError::NotFound(filename.to_string()))?;

        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(PhotoError::NotFound(filename.to_string()))
            }
            Err(e) => Err(PhotoError::Io(e)),
        }
    }

    /// Best-effort removal of stored photos.
    pub async fn discard(&self, filenames: &[String]) {
        for name in filenames {
            let Some(path) = self.resolve(name) else {
                continue;
            };
            match fs::remove_file(&path).await {
                Ok(()) => debug!(file = %name, "discarded photo"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!(file = %name, error = %e, "failed to discard photo"),
            }
        }
    }

    /// Maps a stored filename to its path, refusing anything that is not a
    /// plain file name inside the store directory.
    fn resolve(&self, filename: &str) -> Option<PathBuf> {
        let plain = !filename.is_empty()
            && filename != "."
            && filename != ".."
            && !filename.contains(['/', '\\', '\0']);
        plain.then(|| self.dir.join(filename))
    }

    async fn write_new(&self, upload: &PhotoUpload) -> Result<String, PhotoError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let name = generate_filename(upload.extension());
            let path = self.dir.join(&name);

            let file = fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await;

            let mut file = match file {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists && attempt < MAX_NAME_ATTEMPTS => {
                    continue;
                }
                Err(e) => return Err(PhotoError::Io(e)),
            };

            let written = async {
                file.write_all(&upload.data).await?;
                file.sync_all().await
            }
            .await;

            if let Err(e) = written {
                drop(file);
                let _ = fs::remove_file(&path).await;
                return Err(PhotoError::Io(e));
            }

            counter!("lead_capture.photos.stored", 1);
            debug!(file = %name, "stored photo");
            return Ok(name);
        }
    }

    fn rejected(&self, err: PhotoError) -> PhotoError {
        counter!("lead_capture.photos.rejected", 1, "reason" => err.reason());
        err
    }
}

/// Content type served for a stored filename
pub fn content_type_for(filename: &str) -> &'static str {
    let ext = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

fn generate_filename(extension: Option<&str>) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let suffix: u32 = rand::thread_rng().gen();
    match extension {
        Some(ext) => format!("{FILENAME_PREFIX}{nanos}-{suffix}.{ext}"),
        None => format!("{FILENAME_PREFIX}{nanos}-{suffix}"),
    }
}
