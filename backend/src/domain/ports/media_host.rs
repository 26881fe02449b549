//! Port for the remote media host that stores cover images.

use async_trait::async_trait;

use crate::domain::media::CoverAssetId;

use super::define_port_error;

define_port_error! {
    /// Errors raised by media host adapters.
    pub enum MediaHostError {
        /// The host could not be reached or the request timed out.
        Transport { message: String } => "media host request failed: {message}",
        /// The host answered with an error status.
        Rejected { status: u16, message: String } => "media host rejected the request ({status}): {message}",
        /// The host answered with an unexpected body.
        Decode { message: String } => "media host response could not be decoded: {message}",
    }
}

/// Result of deleting an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The asset existed and was removed.
    Deleted,
    /// The host no longer knew the asset.
    AlreadyGone,
}

/// Remote storage for uploaded images.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaHost: Send + Sync {
    /// Verify that the host accepts our credentials.
    async fn ping(&self) -> Result<(), MediaHostError>;

    /// Store `bytes` and return the asset's stable identifier.
    async fn upload(&self, bytes: Vec<u8>) -> Result<CoverAssetId, MediaHostError>;

    /// Remove a previously uploaded asset.
    async fn delete(&self, asset: &CoverAssetId) -> Result<DeleteOutcome, MediaHostError>;
}
