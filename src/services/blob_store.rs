// src/services/blob_store.rs
use crate::config::BlobStoreConfig;
use crate::errors::BrandKitError;
use bytes::Bytes;
use log::info;
use reqwest::Client;

/// Object storage reached with a plain authenticated `PUT {endpoint}/{key}`.
pub struct HttpBlobStore {
    config: BlobStoreConfig,
    client: Client,
}

impl HttpBlobStore {
    pub fn new(config: BlobStoreConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.config.public_url.trim_end_matches('/'), key)
    }

    pub async fn put(&self, data: Bytes, key: &str, content_type: &str) -> Result<String, BrandKitError> {
        let key = key.trim_start_matches('/');
        if key.is_empty() {
            return Err(BrandKitError::Validation("Missing blob key".to_string()));
        }

        let mut request = self
            .client
            .put(format!("{}/{}", self.config.endpoint.trim_end_matches('/'), key))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(data);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| BrandKitError::Provider(format!("Upload failed: {}", e)))?;
        if !response.status().is_success() {
            return Err(BrandKitError::Provider(format!(
                "Upload failed: {}",
                response.status()
            )));
        }

        let url = self.public_url(key);
        info!("Uploaded blob {}", url);
        Ok(url)
    }
}
