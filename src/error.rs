use thiserror::Error;

/// Query-level failure raised by the data-access façade.
///
/// Wraps the backend-native error so callers can log it verbatim; nothing at this layer
/// retries.
#[derive(Debug, Error)]
pub enum DataAccessError {
    #[error(transparent)]
    Postgres(#[from] tokio_postgres::Error),

    #[error(transparent)]
    PostgresPool(#[from] bb8::RunError<tokio_postgres::Error>),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("Column error: {0}")]
    Column(String),

    #[error("TLS setup error: {0}")]
    Tls(#[from] rustls::Error),

    #[error("SQLite worker error: {0}")]
    Worker(String),

    #[error("database backend is closed")]
    Closed,
}

/// Failure talking to the remote object store.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("object store responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("object store rejected the request: {0}")]
    Rejected(String),
}

/// Application-level error taxonomy.
///
/// Startup-phase variants (`Connection`, `SchemaSync`) are fatal to the process; everything
/// else is a structured request-phase failure.
#[derive(Debug, Error)]
pub enum SiteError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Schema sync failed for table `{table}`: {source}")]
    SchemaSync {
        table: &'static str,
        #[source]
        source: DataAccessError,
    },

    #[error(transparent)]
    DataAccess(#[from] DataAccessError),

    #[error("Failed to save setting `{name}`: {source}")]
    Setting {
        name: String,
        #[source]
        source: DataAccessError,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    #[error("Password hashing error: {0}")]
    Hash(String),

    #[error("Token error: {0}")]
    Token(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl SiteError {
    /// HTTP status the routing layer should answer with for this failure.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            SiteError::BadRequest(_) | SiteError::InvalidUpload(_) => 400,
            SiteError::Unauthorized(_) => 401,
            SiteError::Forbidden(_) => 403,
            SiteError::NotFound(_) => 404,
            SiteError::Conflict(_) => 409,
            SiteError::Upload(_) => 502,
            SiteError::Connection(_)
            | SiteError::SchemaSync { .. }
            | SiteError::DataAccess(_)
            | SiteError::Setting { .. }
            | SiteError::Hash(_)
            | SiteError::Token(_)
            | SiteError::Config(_)
            | SiteError::Json(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(SiteError::Forbidden("last".into()).status_code(), 403);
        assert_eq!(SiteError::Conflict("dup".into()).status_code(), 409);
        assert_eq!(SiteError::NotFound("x".into()).status_code(), 404);
        assert_eq!(
            SiteError::DataAccess(DataAccessError::Closed).status_code(),
            500
        );
        assert_eq!(
            SiteError::Upload(UploadError::Rejected("nope".into())).status_code(),
            502
        );
    }
}
