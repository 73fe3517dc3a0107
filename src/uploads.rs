use std::sync::Arc;

use clap::ValueEnum;
use serde::Serialize;
use tracing::{error, info};

use crate::error::SiteError;
use crate::storage::{ObjectStore, UploadedFile};

/// Upload size limit applied when none is configured (20 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Content filter shared by every image upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadPolicy {
    pub max_bytes: usize,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl UploadPolicy {
    /// Accept only non-empty image files within the size limit.
    ///
    /// # Errors
    /// Returns `SiteError::InvalidUpload` describing the first rule broken.
    pub fn check(&self, file: &UploadedFile) -> Result<(), SiteError> {
        if file.bytes.is_empty() {
            return Err(SiteError::InvalidUpload(format!(
                "`{}` is empty.",
                file.file_name
            )));
        }
        if !file.is_image() {
            return Err(SiteError::InvalidUpload(
                "Only image files are allowed.".to_string(),
            ));
        }
        if file.bytes.len() > self.max_bytes {
            return Err(SiteError::InvalidUpload(format!(
                "`{}` is {} bytes; the limit is {} bytes.",
                file.file_name,
                file.bytes.len(),
                self.max_bytes
            )));
        }
        Ok(())
    }
}

/// Single-image site assets, each referenced by one setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AssetKind {
    Logo,
    AboutImage,
    AcademicsImage,
}

impl AssetKind {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            AssetKind::Logo => "logo",
            AssetKind::AboutImage => "\"About Us\" image",
            AssetKind::AcademicsImage => "\"Academics\" image",
        }
    }

    /// Setting that stores the uploaded asset's URL.
    #[must_use]
    pub fn setting_key(self) -> &'static str {
        match self {
            AssetKind::Logo => "logoURL",
            AssetKind::AboutImage => "aboutUsImageURL",
            AssetKind::AcademicsImage => "academicsImageURL",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedAsset {
    pub kind: AssetKind,
    pub url: String,
}

/// Stores site assets. Saving the returned URL into settings is the caller's job.
#[derive(Clone)]
pub struct AssetUploader {
    store: Arc<dyn ObjectStore>,
    policy: UploadPolicy,
}

impl AssetUploader {
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>, policy: UploadPolicy) -> Self {
        Self { store, policy }
    }

    /// # Errors
    /// `SiteError::InvalidUpload` for a rejected file, `SiteError::Upload` when the store fails.
    pub async fn upload_asset(
        &self,
        kind: AssetKind,
        file: &UploadedFile,
    ) -> Result<UploadedAsset, SiteError> {
        self.policy.check(file)?;
        let stored = self
            .store
            .put(&file.file_name, &file.bytes, &file.content_type)
            .await
            .map_err(|e| {
                error!(asset = kind.label(), error = %e, "asset upload failed");
                SiteError::Upload(e)
            })?;
        info!(asset = kind.label(), url = %stored.url, "asset uploaded");
        Ok(UploadedAsset {
            kind,
            url: stored.url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryObjectStore;

    #[test]
    fn policy_rejects_non_images_and_oversized_files() {
        let policy = UploadPolicy { max_bytes: 4 };
        assert!(policy.check(&UploadedFile::new("a.png", "image/png", vec![1, 2])).is_ok());
        assert!(matches!(
            policy.check(&UploadedFile::new("a.txt", "text/plain", vec![1])),
            Err(SiteError::InvalidUpload(_))
        ));
        assert!(matches!(
            policy.check(&UploadedFile::new("a.png", "image/png", vec![0; 5])),
            Err(SiteError::InvalidUpload(_))
        ));
        assert!(matches!(
            policy.check(&UploadedFile::new("a.png", "image/png", vec![])),
            Err(SiteError::InvalidUpload(_))
        ));
    }

    #[tokio::test]
    async fn asset_upload_returns_store_url() -> Result<(), SiteError> {
        let store = Arc::new(MemoryObjectStore::new());
        let uploader = AssetUploader::new(store.clone(), UploadPolicy::default());
        let asset = uploader
            .upload_asset(
                AssetKind::Logo,
                &UploadedFile::new("logo.png", "image/png", vec![1, 2, 3]),
            )
            .await?;
        assert!(store.contains(&asset.url));
        assert_eq!(asset.kind.setting_key(), "logoURL");

        let failing = AssetUploader::new(
            Arc::new(MemoryObjectStore::failing_puts()),
            UploadPolicy::default(),
        );
        let res = failing
            .upload_asset(
                AssetKind::AboutImage,
                &UploadedFile::new("about.png", "image/png", vec![1]),
            )
            .await;
        assert!(matches!(res, Err(SiteError::Upload(_))));
        Ok(())
    }
}
