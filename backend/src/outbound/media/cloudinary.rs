//! Reqwest-backed Cloudinary adapter.
//!
//! Uploads and destroys are signed with SHA-256 over the sorted request
//! parameters plus the API secret. The ping uses the Admin API with basic
//! auth so bad credentials fail at startup rather than on the first upload.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockable::Clock;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use tracing::debug;
use zeroize::Zeroizing;

use super::dto::{DestroyResponseDto, ErrorEnvelopeDto, UploadResponseDto};
use crate::domain::CoverAssetId;
use crate::domain::ports::{DeleteOutcome, MediaHost, MediaHostError};

/// Public Cloudinary API root.
pub const DEFAULT_API_BASE: &str = "https://api.cloudinary.com/v1_1/";

/// Account credentials and transport settings.
pub struct CloudinaryConfig {
    /// API root; overridden in tests and for self-hosted proxies.
    pub api_base: Url,
    /// Cloud name, the first path segment of every endpoint.
    pub cloud_name: String,
    /// Public API key.
    pub api_key: String,
    /// Signing secret.
    pub api_secret: Zeroizing<String>,
    /// Prefix applied to uploaded public ids.
    pub folder: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// Media host adapter speaking the Cloudinary REST API.
pub struct CloudinaryMediaHost {
    client: Client,
    config: CloudinaryConfig,
    clock: Arc<dyn Clock>,
}

impl CloudinaryMediaHost {
    /// Build the adapter with a client honouring the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(config: CloudinaryConfig, clock: Arc<dyn Clock>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            config,
            clock,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, MediaHostError> {
        self.config
            .api_base
            .join(&format!("{}/{path}", self.config.cloud_name))
            .map_err(|err| MediaHostError::transport(format!("invalid endpoint: {err}")))
    }

    fn signed_params(&self, mut params: BTreeMap<&'static str, String>) -> BTreeMap<&'static str, String> {
        params.insert("timestamp", self.clock.utc().timestamp().to_string());
        let signature = sign(&params, &self.config.api_secret);
        params.insert("api_key", self.config.api_key.clone());
        params.insert("signature", signature);
        params.insert("signature_algorithm", "sha256".to_owned());
        params
    }

    async fn read<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, MediaHostError> {
        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        serde_json::from_slice(body.as_ref())
            .map_err(|err| MediaHostError::decode(format!("invalid media host payload: {err}")))
    }
}

/// Cloudinary request signature: SHA-256 of `k1=v1&k2=v2` (keys sorted,
/// empty values skipped) followed by the secret.
fn sign(params: &BTreeMap<&'static str, String>, secret: &str) -> String {
    let payload = params
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");
    let mut digest = Sha256::new();
    digest.update(payload.as_bytes());
    digest.update(secret.as_bytes());
    hex::encode(digest.finalize())
}

#[async_trait]
impl MediaHost for CloudinaryMediaHost {
    async fn ping(&self) -> Result<(), MediaHostError> {
        let response = self
            .client
            .get(self.endpoint("ping")?)
            .basic_auth(&self.config.api_key, Some(self.config.api_secret.as_str()))
            .send()
            .await
            .map_err(map_transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.bytes().await.map_err(map_transport_error)?;
        Err(map_status_error(status, body.as_ref()))
    }

    async fn upload(&self, bytes: Vec<u8>) -> Result<CoverAssetId, MediaHostError> {
        let size = bytes.len();
        let mut params = BTreeMap::new();
        if !self.config.folder.is_empty() {
            params.insert("public_id_prefix", self.config.folder.clone());
        }
        let form = self
            .signed_params(params)
            .into_iter()
            .fold(Form::new(), |form, (key, value)| form.text(key, value))
            .part("file", Part::bytes(bytes).file_name("cover"));

        let response = self
            .client
            .post(self.endpoint("auto/upload")?)
            .multipart(form)
            .send()
            .await
            .map_err(map_transport_error)?;
        let asset = Self::read::<UploadResponseDto>(response)
            .await?
            .into_asset()
            .map_err(MediaHostError::decode)?;
        debug!(asset = %asset, size, "cover uploaded");
        Ok(asset)
    }

    async fn delete(&self, asset: &CoverAssetId) -> Result<DeleteOutcome, MediaHostError> {
        let mut params = BTreeMap::new();
        params.insert("public_id", asset.as_str().to_owned());
        params.insert("invalidate", "true".to_owned());
        let response = self
            .client
            .post(self.endpoint("image/destroy")?)
            .form(&self.signed_params(params))
            .send()
            .await
            .map_err(map_transport_error)?;
        Self::read::<DestroyResponseDto>(response)
            .await?
            .into_outcome()
            .map_err(MediaHostError::decode)
    }
}

fn map_transport_error(error: reqwest::Error) -> MediaHostError {
    MediaHostError::transport(error.to_string())
}

fn map_status_error(status: StatusCode, body: &[u8]) -> MediaHostError {
    let message = serde_json::from_slice::<ErrorEnvelopeDto>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body_preview(body));
    let message = if message.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        message
    };
    if status.is_server_error() {
        MediaHostError::transport(message)
    } else {
        MediaHostError::rejected(status.as_u16(), message)
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    compact.chars().take(PREVIEW_CHAR_LIMIT).collect()
}
