//! Lifecycle of remotely hosted cover images.
//!
//! [`MediaAttachmentManager::replace`] runs the upload, persist, delete-old
//! protocol: the previous asset is only released once the new identifier is
//! durably stored, and a failed persist releases the freshly uploaded asset
//! so nothing leaks.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::ports::{DeleteOutcome, MediaHost, MediaHostError};
use super::trace_id::TraceId;
use super::Error;

/// Identifier assigned to an uploaded asset by the media host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoverAssetId(String);

impl CoverAssetId {
    /// Wrap a host-assigned identifier, rejecting blank input.
    #[must_use]
    pub fn new(raw: impl AsRef<str>) -> Option<Self> {
        let trimmed = raw.as_ref().trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_owned()))
    }

    /// Identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for CoverAssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle on the background deletion of a superseded asset.
#[derive(Debug)]
pub struct RetiredAsset {
    asset: CoverAssetId,
    handle: JoinHandle<Result<DeleteOutcome, MediaHostError>>,
}

impl RetiredAsset {
    /// Asset being deleted.
    #[must_use]
    pub const fn asset(&self) -> &CoverAssetId {
        &self.asset
    }

    /// Wait for the deletion to finish. `None` when the task was aborted.
    pub async fn settled(self) -> Option<Result<DeleteOutcome, MediaHostError>> {
        self.handle.await.ok()
    }
}

/// Result of a successful cover replacement.
#[derive(Debug)]
pub struct CoverChange {
    /// Newly stored cover.
    pub asset: CoverAssetId,
    /// Deletion of the previous cover, when there was one.
    pub retired: Option<RetiredAsset>,
}

/// Uploads, replaces and releases cover assets.
#[derive(Clone)]
pub struct MediaAttachmentManager {
    host: Arc<dyn MediaHost>,
}

impl MediaAttachmentManager {
    /// Build a manager over a media host.
    pub fn new(host: Arc<dyn MediaHost>) -> Self {
        Self { host }
    }

    /// Upload a cover image.
    pub async fn upload(&self, bytes: Vec<u8>) -> Result<CoverAssetId, Error> {
        if bytes.is_empty() {
            return Err(Error::invalid_request("cover file must not be empty")
                .with_details(json!({"field": "cover", "code": "empty_file"})));
        }
        let size = bytes.len();
        let asset = self.host.upload(bytes).await.map_err(|err| {
            warn!(error = %err, size, "cover upload failed");
            map_media_error(&err)
        })?;
        debug!(asset = %asset, size, "cover uploaded");
        Ok(asset)
    }

    /// Delete an asset. A host that no longer knows it reports
    /// [`DeleteOutcome::AlreadyGone`], which counts as success.
    pub async fn release(&self, asset: &CoverAssetId) -> Result<DeleteOutcome, MediaHostError> {
        release_logged(self.host.as_ref(), asset).await
    }

    /// Delete an asset on a background task without waiting for the host.
    pub fn release_detached(&self, asset: CoverAssetId) -> RetiredAsset {
        let host = Arc::clone(&self.host);
        let target = asset.clone();
        let handle =
            TraceId::spawn_in_scope(async move { release_logged(host.as_ref(), &target).await });
        RetiredAsset { asset, handle }
    }

    /// Upload `bytes`, hand the new id to `persist`, then retire the asset
    /// `persist` reports as previously stored.
    ///
    /// When `persist` fails the new asset is released before the error is
    /// returned and the previous asset is left untouched.
    pub async fn replace<F, Fut>(&self, bytes: Vec<u8>, persist: F) -> Result<CoverChange, Error>
    where
        F: FnOnce(CoverAssetId) -> Fut + Send,
        Fut: Future<Output = Result<Option<CoverAssetId>, Error>> + Send,
    {
        let asset = self.upload(bytes).await?;
        match persist(asset.clone()).await {
            Ok(previous) => {
                let retired = previous
                    .filter(|old| *old != asset)
                    .map(|old| self.release_detached(old));
                Ok(CoverChange { asset, retired })
            }
            Err(error) => {
                if self.release(&asset).await.is_err() {
                    warn!(asset = %asset, "uploaded cover leaked after failed persist");
                }
                Err(error)
            }
        }
    }
}

async fn release_logged(
    host: &dyn MediaHost,
    asset: &CoverAssetId,
) -> Result<DeleteOutcome, MediaHostError> {
    match host.delete(asset).await {
        Ok(outcome) => {
            debug!(asset = %asset, ?outcome, "cover released");
            Ok(outcome)
        }
        Err(err) => {
            warn!(asset = %asset, error = %err, "cover release failed");
            Err(err)
        }
    }
}

fn map_media_error(error: &MediaHostError) -> Error {
    match error {
        MediaHostError::Transport { .. } => Error::service_unavailable("media host unavailable"),
        MediaHostError::Rejected { .. } | MediaHostError::Decode { .. } => {
            Error::internal(format!("failed to upload cover: {error}"))
        }
    }
}

#[cfg(test)]
#[path = "media_tests.rs"]
mod tests;
