//! services/api/src/adapters/storage.rs
//!
//! Object storage adapter implementing the `ObjectStorageService` port.
//! Uploads raw image bytes to an S3-style HTTP object store with a public
//! base URL; the uploaded object's URL becomes the durable Photo reference.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use uuid::Uuid;

use lingualive_core::ports::{ObjectStorageService, PortError, PortResult};

/// Bucket folder all uploads land in.
const STORAGE_FOLDER: &str = "lingualive";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that stores images via HTTP PUT against an object store.
#[derive(Clone)]
pub struct HttpStorageAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpStorageAdapter {
    /// Creates a new `HttpStorageAdapter`.
    pub fn new(client: reqwest::Client, base_url: String, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url,
            api_key,
        }
    }
}

//=========================================================================================
// `ObjectStorageService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ObjectStorageService for HttpStorageAdapter {
    async fn store_image(&self, bytes: &[u8], content_type: &str) -> PortResult<String> {
        let url = format!(
            "{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            STORAGE_FOLDER,
            Uuid::new_v4()
        );

        let mut request = self
            .client
            .put(&url)
            .header(CONTENT_TYPE, content_type)
            .body(bytes.to_vec());
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("Image upload failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(PortError::Unexpected(format!(
                "Image upload rejected with status {}",
                response.status()
            )));
        }

        Ok(url)
    }
}
