// crates/cat-api-contract/src/fixture.rs
// ============================================================================
// Module: Upload Fixtures
// Description: Local image files used as upload input.
// Purpose: Load fixture bytes and metadata before any request is issued.
// Dependencies: thiserror, tokio
// ============================================================================

//! ## Overview
//! A [`Fixture`] is read fully into memory up front. A missing or unreadable
//! file is reported before the upload request is built, so no partial
//! request ever reaches the API.

use std::path::Path;
use std::path::PathBuf;

use thiserror::Error;

/// Upper bound on fixture size accepted for upload.
pub const MAX_FIXTURE_BYTES: u64 = 10 * 1024 * 1024;

/// Errors raised while loading a fixture.
#[derive(Debug, Error)]
pub enum FixtureError {
    /// The fixture does not exist.
    #[error("fixture not found: {}", path.display())]
    NotFound {
        /// Requested path.
        path: PathBuf,
    },
    /// The fixture could not be read.
    #[error("failed to read fixture {}: {source}", path.display())]
    Io {
        /// Requested path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The fixture exceeds [`MAX_FIXTURE_BYTES`].
    #[error("fixture {} exceeds {MAX_FIXTURE_BYTES} bytes", path.display())]
    TooLarge {
        /// Requested path.
        path: PathBuf,
    },
}

/// In-memory upload fixture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixture {
    /// Source path.
    pub path: PathBuf,
    /// File name sent in the multipart part.
    pub file_name: String,
    /// MIME type derived from the extension.
    pub mime: &'static str,
    /// File contents.
    pub bytes: Vec<u8>,
}

impl Fixture {
    /// Reads a fixture from disk.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::NotFound`] when the path does not exist, and
    /// other variants when it cannot be read or is too large.
    pub async fn load(path: &Path) -> Result<Self, FixtureError> {
        let metadata = match tokio::fs::metadata(path).await {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(FixtureError::NotFound {
                    path: path.to_path_buf(),
                });
            }
            Err(source) => {
                return Err(FixtureError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        if metadata.len() > MAX_FIXTURE_BYTES {
            return Err(FixtureError::TooLarge {
                path: path.to_path_buf(),
            });
        }
        let bytes = tokio::fs::read(path).await.map_err(|source| FixtureError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map_or_else(|| "upload".to_string(), |name| name.to_string_lossy().into_owned());
        Ok(Self {
            path: path.to_path_buf(),
            mime: mime_for(path),
            file_name,
            bytes,
        })
    }
}

/// Maps a file extension to the MIME type declared on upload.
#[must_use]
pub fn mime_for(path: &Path) -> &'static str {
    let ext = path.extension().map(|ext| ext.to_string_lossy().to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}
