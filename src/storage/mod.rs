//! Object storage for user-supplied images.
//!
//! The carousel and asset uploads only see [`ObjectStore`]; the binary picks the concrete
//! store from configuration.

mod local;
mod memory;
mod vercel;

pub use local::LocalDirStore;
pub use memory::MemoryObjectStore;
pub use vercel::VercelBlobStore;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::UploadError;

/// A file received from an operator, held in memory until it is stored.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    #[must_use]
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    #[must_use]
    pub fn is_image(&self) -> bool {
        self.content_type
            .trim()
            .to_ascii_lowercase()
            .starts_with("image/")
    }
}

/// Where a stored object can be fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredObject {
    pub url: String,
}

/// Remote (or local) blob storage.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under a name derived from `name` and return its public URL.
    async fn put(
        &self,
        name: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<StoredObject, UploadError>;

    /// Remove the object behind `url`.
    async fn delete(&self, url: &str) -> Result<(), UploadError>;
}

/// Guess an image content type from a file extension.
#[must_use]
pub fn content_type_for(file_name: &str) -> &'static str {
    let ext = std::path::Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("avif") => "image/avif",
        _ => "application/octet-stream",
    }
}
