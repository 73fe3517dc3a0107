//! Convenient imports for common functionality.
//!
//! This module re-exports the types most callers need to open the database and drive
//! the stores.

pub use crate::accounts::{AccountStore, AccountSummary, SeedOutcome, Verification};
pub use crate::auth::{
    AuthService, BcryptHasher, Claims, JwtTokenService, LoginRequest, LoginResponse,
    PasswordHasher, TokenService,
};
pub use crate::carousel::{CarouselCreated, CarouselImage, CarouselLedger, NewCarouselImage};
pub use crate::contact::{ContactDefaults, ContactOutcome, ContactRouter, ContactSubmission};
pub use crate::db::Database;
pub use crate::error::{DataAccessError, SiteError, UploadError};
pub use crate::manager::{ConnectionManager, DatabaseConfig};
pub use crate::pool::Backend;
pub use crate::results::{DbRow, ExecOutcome, ResultSet};
pub use crate::settings::{SettingsMap, SettingsStore};
pub use crate::site::{PublicSite, load_public_site, merge_settings};
pub use crate::storage::{
    LocalDirStore, MemoryObjectStore, ObjectStore, StoredObject, UploadedFile, VercelBlobStore,
};
pub use crate::translation::{Dialect, translate_placeholders};
pub use crate::types::{DatabaseType, RowValues};
pub use crate::uploads::{AssetKind, AssetUploader, UploadPolicy};
