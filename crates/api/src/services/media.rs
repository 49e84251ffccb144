//! Cloudinary-compatible media client for product images.
//!
//! Requests are authenticated with a signature: the request parameters
//! sorted by name, joined as `k=v&k=v`, with the API secret appended and
//! hashed with SHA-256.

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::instrument;

use crate::config::MediaConfig;

/// Media API base URL.
const BASE_URL: &str = "https://api.cloudinary.com/v1_1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur when talking to the media service.
#[derive(Debug, Error)]
pub enum MediaError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// A stored image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    pub url: String,
    pub public_id: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

/// Media API client.
#[derive(Clone)]
pub struct MediaClient {
    client: reqwest::Client,
    cloud_name: String,
    api_key: String,
    api_secret: SecretString,
    folder: String,
}

impl std::fmt::Debug for MediaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaClient")
            .field("cloud_name", &self.cloud_name)
            .field("folder", &self.folder)
            .finish_non_exhaustive()
    }
}

impl MediaClient {
    /// Create a new media client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &MediaConfig) -> Result<Self, MediaError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            cloud_name: config.cloud_name.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            folder: config.upload_folder.clone(),
        })
    }

    /// Upload an image into the configured folder.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or the response is malformed.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn upload(
        &self,
        file_name: &str,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<UploadedImage, MediaError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign(
            &[("folder", self.folder.as_str()), ("timestamp", timestamp.as_str())],
            &self.api_secret,
        );

        let mut part = Part::bytes(bytes).file_name(file_name.to_owned());
        if let Some(content_type) = content_type {
            part = part.mime_str(content_type)?;
        }

        let form = Form::new()
            .part("file", part)
            .text("api_key", self.api_key.clone())
            .text("folder", self.folder.clone())
            .text("timestamp", timestamp)
            .text("signature_algorithm", "sha256")
            .text("signature", signature);

        let url = format!("{BASE_URL}/{}/image/upload", self.cloud_name);
        let response = self.client.post(&url).multipart(form).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MediaError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| MediaError::Parse(e.to_string()))?;

        tracing::debug!(public_id = %uploaded.public_id, "Image uploaded");

        Ok(UploadedImage {
            url: uploaded.secure_url,
            public_id: uploaded.public_id,
        })
    }

    /// Delete a stored image.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn destroy(&self, public_id: &str) -> Result<(), MediaError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign(
            &[("public_id", public_id), ("timestamp", timestamp.as_str())],
            &self.api_secret,
        );

        let form = Form::new()
            .text("public_id", public_id.to_owned())
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature_algorithm", "sha256")
            .text("signature", signature);

        let url = format!("{BASE_URL}/{}/image/destroy", self.cloud_name);
        let response = self.client.post(&url).multipart(form).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MediaError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: DestroyResponse = response
            .json()
            .await
            .map_err(|e| MediaError::Parse(e.to_string()))?;

        // "not found" means the asset is already gone
        if body.result != "ok" && body.result != "not found" {
            return Err(MediaError::Api {
                status: status.as_u16(),
                message: body.result,
            });
        }
        Ok(())
    }

    /// Destroy images, logging failures instead of returning them.
    ///
    /// Used after a delete has committed, when the rows are already gone.
    pub async fn destroy_all(&self, public_ids: &[String]) {
        for public_id in public_ids {
            if let Err(e) = self.destroy(public_id).await {
                tracing::warn!(public_id = %public_id, error = %e, "Failed to destroy image");
            }
        }
    }
}

/// Compute a request signature.
fn sign(params: &[(&str, &str)], secret: &SecretString) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_unstable_by(|a, b| a.0.cmp(b.0));

    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(secret.expose_secret().as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_is_order_independent() {
        let secret = SecretString::from("abcd");
        let a = sign(&[("timestamp", "1315060510"), ("public_id", "sample")], &secret);
        let b = sign(&[("public_id", "sample"), ("timestamp", "1315060510")], &secret);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_signature_matches_manual_digest() {
        let secret = SecretString::from("abcd");
        let expected = hex::encode(Sha256::digest(
            b"folder=products&timestamp=1315060510abcd",
        ));
        assert_eq!(
            sign(&[("timestamp", "1315060510"), ("folder", "products")], &secret),
            expected
        );
    }

    #[test]
    fn test_debug_hides_secret() {
        let client = MediaClient::new(&MediaConfig {
            cloud_name: "mart".to_string(),
            api_key: "123456".to_string(),
            api_secret: SecretString::from("super-private-value"),
            upload_folder: "products".to_string(),
        })
        .unwrap_or_else(|e| panic!("client should build: {e}"));
        let debug = format!("{client:?}");
        assert!(!debug.contains("super-private-value"));
        assert!(!debug.contains("123456"));
    }
}
