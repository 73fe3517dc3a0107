//! Ordered carousel images backed by the object store.
//!
//! Creating an image is two phases: the file goes to the object store first, then the row
//! is inserted. Deleting runs the other way round. A failed insert leaves an orphaned blob
//! behind; its URL is logged at `error` so it can be cleaned up by hand.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::db::Database;
use crate::error::{DataAccessError, SiteError};
use crate::results::DbRow;
use crate::storage::{ObjectStore, UploadedFile};
use crate::types::RowValues;
use crate::uploads::UploadPolicy;

pub const DEFAULT_ALT_TEXT: &str = "Carousel Image";

const SELECT_COLUMNS: &str = "SELECT id, image_url, link_url, alt_text, file_name, display_order FROM carousel_images";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarouselImage {
    pub id: i64,
    pub image_url: String,
    pub link_url: Option<String>,
    pub alt_text: Option<String>,
    pub file_name: Option<String>,
    pub display_order: i64,
}

impl CarouselImage {
    fn from_row(row: &DbRow) -> Result<Self, SiteError> {
        Ok(Self {
            id: row.int("id")?,
            image_url: row.text("image_url")?,
            link_url: row.opt_text("link_url")?,
            alt_text: row.opt_text("alt_text")?,
            file_name: row.opt_text("file_name")?,
            display_order: row.opt_int("display_order")?.unwrap_or(0),
        })
    }
}

/// Request to add an image.
#[derive(Debug, Clone)]
pub struct NewCarouselImage {
    pub file: UploadedFile,
    pub alt_text: Option<String>,
    pub link_url: Option<String>,
}

/// What the editing console gets back after a create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CarouselCreated {
    pub id: i64,
    pub image_url: String,
}

impl From<&CarouselImage> for CarouselCreated {
    fn from(image: &CarouselImage) -> Self {
        Self {
            id: image.id,
            image_url: image.image_url.clone(),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

#[derive(Clone)]
pub struct CarouselLedger {
    db: Database,
    store: Arc<dyn ObjectStore>,
    policy: UploadPolicy,
}

impl CarouselLedger {
    #[must_use]
    pub fn new(db: Database, store: Arc<dyn ObjectStore>, policy: UploadPolicy) -> Self {
        Self { db, store, policy }
    }

    /// Every image in public order: `display_order`, then `id`.
    ///
    /// # Errors
    /// Returns `SiteError::DataAccess` on query failure.
    pub async fn list(&self) -> Result<Vec<CarouselImage>, SiteError> {
        let sql = format!("{SELECT_COLUMNS} ORDER BY display_order ASC, id ASC");
        let rows = self.db.fetch_all(&sql, &[]).await?;
        rows.iter().map(CarouselImage::from_row).collect()
    }

    /// # Errors
    /// Returns `SiteError::DataAccess` on query failure.
    pub async fn get(&self, id: i64) -> Result<Option<CarouselImage>, SiteError> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = ?");
        let row = self.db.fetch_one(&sql, &[RowValues::Int(id)]).await?;
        row.as_ref().map(CarouselImage::from_row).transpose()
    }

    /// Upload the file, then record it at the end of the carousel.
    ///
    /// # Errors
    /// `SiteError::InvalidUpload` before anything is stored, `SiteError::Upload` when the
    /// object store fails, `SiteError::DataAccess` when the insert fails (the blob is then
    /// orphaned).
    pub async fn create(&self, request: NewCarouselImage) -> Result<CarouselImage, SiteError> {
        let NewCarouselImage {
            file,
            alt_text,
            link_url,
        } = request;
        self.policy.check(&file)?;

        let stored = self
            .store
            .put(&file.file_name, &file.bytes, &file.content_type)
            .await
            .map_err(|e| {
                error!(file = %file.file_name, error = %e, "carousel blob upload failed");
                SiteError::Upload(e)
            })?;

        let alt_text = non_blank(alt_text).unwrap_or_else(|| DEFAULT_ALT_TEXT.to_string());
        let params = [
            RowValues::Text(stored.url.clone()),
            RowValues::from(non_blank(link_url)),
            RowValues::Text(alt_text),
            RowValues::Text(file.file_name.clone()),
        ];
        let outcome = match self
            .db
            .execute(
                "INSERT INTO carousel_images (image_url, link_url, alt_text, file_name, display_order) \
                 VALUES (?, ?, ?, ?, (SELECT IFNULL(MAX(display_order), 0) + 1 FROM carousel_images))",
                &params,
            )
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(orphaned_url = %stored.url, error = %e, "carousel insert failed after upload; blob orphaned");
                return Err(SiteError::DataAccess(e));
            }
        };

        let id = outcome.inserted_id.ok_or_else(|| {
            error!(orphaned_url = %stored.url, "carousel insert reported no id");
            SiteError::DataAccess(DataAccessError::Column(format!(
                "no id reported for carousel image {}",
                stored.url
            )))
        })?;
        let image = self.get(id).await?.ok_or_else(|| {
            SiteError::NotFound(format!("carousel image {id} vanished after insert"))
        })?;
        info!(id, url = %image.image_url, display_order = image.display_order, "carousel image added");
        Ok(image)
    }

    /// Delete the row, then make a best-effort attempt to delete the blob.
    ///
    /// # Errors
    /// `SiteError::NotFound` when no image has `id`; `SiteError::DataAccess` on query failure.
    /// Blob deletion failures are logged, never returned.
    pub async fn delete(&self, id: i64) -> Result<CarouselImage, SiteError> {
        let image = self
            .get(id)
            .await?
            .ok_or_else(|| SiteError::NotFound(format!("Image {id} not found.")))?;

        self.db
            .execute("DELETE FROM carousel_images WHERE id = ?", &[RowValues::Int(id)])
            .await?;

        if !image.image_url.is_empty() {
            if let Err(e) = self.store.delete(&image.image_url).await {
                warn!(id, url = %image.image_url, error = %e, "carousel row deleted but blob removal failed");
            }
        }
        info!(id, "carousel image deleted");
        Ok(image)
    }
}
