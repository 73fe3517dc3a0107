use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};
use url::Url;

use super::{ObjectStore, StoredObject};
use crate::error::UploadError;

pub const DEFAULT_BLOB_ENDPOINT: &str = "https://blob.vercel-storage.com";
const API_VERSION: &str = "7";

#[derive(Debug, Deserialize)]
struct PutBlobResponse {
    url: String,
}

/// Vercel Blob over its HTTP API: public objects, bearer-token auth.
#[derive(Debug, Clone)]
pub struct VercelBlobStore {
    http_client: reqwest::Client,
    endpoint: Url,
    token: String,
}

impl VercelBlobStore {
    /// # Errors
    /// Returns `UploadError::Http` if the HTTP client cannot be built.
    pub fn new(token: impl Into<String>) -> Result<Self, UploadError> {
        let endpoint = Url::parse(DEFAULT_BLOB_ENDPOINT)
            .map_err(|e| UploadError::Rejected(format!("invalid blob endpoint: {e}")))?;
        Self::with_endpoint(token, endpoint)
    }

    /// Point at a different API host (self-hosted proxy, test server).
    ///
    /// # Errors
    /// Returns `UploadError::Http` if the HTTP client cannot be built.
    pub fn with_endpoint(token: impl Into<String>, endpoint: Url) -> Result<Self, UploadError> {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-version", HeaderValue::from_static(API_VERSION));
        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;
        Ok(Self {
            http_client,
            endpoint,
            token: token.into(),
        })
    }

    fn object_url(&self, name: &str) -> Result<Url, UploadError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| UploadError::Rejected("blob endpoint cannot be a base URL".into()))?
            .pop_if_empty()
            .push(name);
        Ok(url)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, UploadError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(UploadError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl ObjectStore for VercelBlobStore {
    async fn put(
        &self,
        name: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<StoredObject, UploadError> {
        let url = self.object_url(name)?;
        debug!(%url, size = bytes.len(), "uploading blob");
        let response = self
            .http_client
            .put(url)
            .bearer_auth(&self.token)
            .header("x-content-type", content_type)
            .header("x-add-random-suffix", "1")
            .body(bytes.to_vec())
            .send()
            .await?;
        let blob: PutBlobResponse = Self::check(response).await?.json().await?;
        info!(url = %blob.url, "blob uploaded");
        Ok(StoredObject { url: blob.url })
    }

    async fn delete(&self, url: &str) -> Result<(), UploadError> {
        let endpoint = self.object_url("delete")?;
        let response = self
            .http_client
            .post(endpoint)
            .bearer_auth(&self.token)
            .header(CONTENT_TYPE, "application/json")
            .json(&json!({ "urls": [url] }))
            .send()
            .await?;
        Self::check(response).await?;
        info!(%url, "blob deleted");
        Ok(())
    }
}
