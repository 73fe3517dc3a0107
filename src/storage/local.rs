use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rand::Rng;
use tracing::debug;

use super::{ObjectStore, StoredObject};
use crate::error::UploadError;

const MAX_BASENAME_CHARS: usize = 50;
const TOKEN_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Writes objects into a directory served under a public URL prefix.
///
/// Stored names are `<sanitized basename>-<unix millis>-<6 random chars><ext>`, so two
/// uploads of the same file never collide.
#[derive(Debug, Clone)]
pub struct LocalDirStore {
    dir: PathBuf,
    url_prefix: String,
}

impl LocalDirStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        let url_prefix = url_prefix.into().trim_end_matches('/').to_owned();
        Self {
            dir: dir.into(),
            url_prefix,
        }
    }

    fn local_path(&self, url: &str) -> Result<PathBuf, UploadError> {
        let name = url
            .strip_prefix(&self.url_prefix)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| UploadError::Rejected(format!("`{url}` is not served by this store")))?;
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(UploadError::Rejected(format!("refusing to delete `{url}`")));
        }
        Ok(self.dir.join(name))
    }
}

/// Storage name for an uploaded file.
#[must_use]
pub fn stored_name(original: &str, millis: i64, token: &str) -> String {
    let path = Path::new(original);
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default();
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("upload");
    let basename: String = stem
        .chars()
        .take(MAX_BASENAME_CHARS)
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{basename}-{millis}-{token}{ext}")
}

fn random_token() -> String {
    let mut rng = rand::rng();
    (0..6)
        .map(|_| char::from(TOKEN_CHARSET[rng.random_range(0..TOKEN_CHARSET.len())]))
        .collect()
}

#[async_trait]
impl ObjectStore for LocalDirStore {
    async fn put(
        &self,
        name: &str,
        bytes: &[u8],
        _content_type: &str,
    ) -> Result<StoredObject, UploadError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let file_name = stored_name(name, chrono::Utc::now().timestamp_millis(), &random_token());
        let path = self.dir.join(&file_name);
        tokio::fs::write(&path, bytes).await?;
        debug!(path = %path.display(), size = bytes.len(), "stored upload on disk");
        Ok(StoredObject {
            url: format!("{}/{file_name}", self.url_prefix),
        })
    }

    async fn delete(&self, url: &str) -> Result<(), UploadError> {
        let path = self.local_path(url)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(UploadError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_names_are_sanitized() {
        assert_eq!(
            stored_name("Sports Day (1).jpg", 1_700_000_000_000, "ab12cd"),
            "Sports_Day__1_-1700000000000-ab12cd.jpg"
        );
        let long = format!("{}.png", "x".repeat(80));
        let name = stored_name(&long, 1, "tok000");
        assert!(name.starts_with(&"x".repeat(50)));
        assert!(name.ends_with("-1-tok000.png"));
    }

    #[tokio::test]
    async fn put_then_delete_round_trip() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let store = LocalDirStore::new(dir.path(), "/uploads/");
        let stored = store.put("logo.png", b"png", "image/png").await?;
        assert!(stored.url.starts_with("/uploads/logo-"));

        let on_disk = store.local_path(&stored.url)?;
        assert!(on_disk.exists());
        store.delete(&stored.url).await?;
        assert!(!on_disk.exists());
        // already gone
        store.delete(&stored.url).await?;

        assert!(store.delete("/elsewhere/logo.png").await.is_err());
        assert!(store.delete("/uploads/../secret").await.is_err());
        Ok(())
    }
}
