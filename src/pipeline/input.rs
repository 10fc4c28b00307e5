//! Input handling: load an uploaded PDF and stage it for the parser.
//!
//! An [`UploadedDocument`] is the in-memory upload: a display name plus the
//! raw bytes. It can come from a local path or an HTTP(S) URL via
//! [`load_document`].
//!
//! The parsing call needs the document as a file. [`StagedDocument`] writes
//! the bytes into a fresh `TempDir`; dropping it removes the directory, so the
//! copy lives exactly as long as the parsing call regardless of how that call
//! ends.

use crate::error::MealPlanError;
use std::fmt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// A PDF upload held in memory for the session.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadedDocument {
    /// File name shown to the user and sent to the parser.
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedDocument {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Content fingerprint; two uploads with the same bytes share cached
    /// results within a session.
    pub fn fingerprint(&self) -> String {
        format!("{:x}", md5::compute(&self.bytes))
    }

    /// Reject empty byte streams and anything without the `%PDF` header.
    pub fn validate(&self) -> Result<(), MealPlanError> {
        if self.bytes.is_empty() {
            return Err(MealPlanError::InvalidInput {
                input: self.name.clone(),
                reason: "document is empty".into(),
            });
        }
        if self.bytes.len() < PDF_MAGIC.len() || &self.bytes[..PDF_MAGIC.len()] != PDF_MAGIC {
            let magic = self.bytes.iter().take(PDF_MAGIC.len()).copied().collect();
            return Err(MealPlanError::NotAPdf {
                name: self.name.clone(),
                magic,
            });
        }
        Ok(())
    }
}

impl fmt::Debug for UploadedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedDocument")
            .field("name", &self.name)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// A temporary on-disk copy of an upload. Removed on drop.
#[derive(Debug)]
pub struct StagedDocument {
    path: PathBuf,
    _temp_dir: TempDir,
}

impl StagedDocument {
    /// Write the document into a new temporary directory.
    pub async fn stage(doc: &UploadedDocument) -> Result<Self, MealPlanError> {
        let temp_dir = TempDir::new().map_err(|e| MealPlanError::Internal(e.to_string()))?;
        let path = temp_dir.path().join(staged_file_name(&doc.name));

        tokio::fs::write(&path, &doc.bytes)
            .await
            .map_err(|e| MealPlanError::Internal(format!("Failed to write temp file: {}", e)))?;

        debug!("Staged {} ({} bytes) at {}", doc.name, doc.bytes.len(), path.display());
        Ok(Self {
            path,
            _temp_dir: temp_dir,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Keep only the final path component and force a `.pdf` extension.
fn staged_file_name(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("document.pdf");
    if base.to_ascii_lowercase().ends_with(".pdf") {
        base.to_string()
    } else {
        format!("{base}.pdf")
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load a PDF from a local path or an HTTP/HTTPS URL.
pub async fn load_document(input: &str, timeout_secs: u64) -> Result<UploadedDocument, MealPlanError> {
    let doc = if is_url(input) {
        download_url(input, timeout_secs).await?
    } else {
        read_local(input).await?
    };
    doc.validate()?;
    Ok(doc)
}

async fn read_local(path_str: &str) -> Result<UploadedDocument, MealPlanError> {
    let path = PathBuf::from(path_str);

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(MealPlanError::PermissionDenied { path });
        }
        Err(_) => return Err(MealPlanError::FileNotFound { path }),
    };

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path_str.to_string());
    debug!("Read local PDF: {} ({} bytes)", path.display(), bytes.len());
    Ok(UploadedDocument::new(name, bytes))
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<UploadedDocument, MealPlanError> {
    info!("Downloading PDF from: {}", url);

    let download_failed = |reason: String| MealPlanError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| download_failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            MealPlanError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            download_failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(download_failed(format!("HTTP {}", response.status())));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| download_failed(e.to_string()))?;

    info!("Downloaded {} bytes", bytes.len());
    Ok(UploadedDocument::new(filename_from_url(url), bytes.to_vec()))
}

/// Last URL path segment when it looks like a file name.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.pdf".to_string()
}
