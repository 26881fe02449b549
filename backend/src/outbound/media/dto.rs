//! Response bodies returned by the Cloudinary upload and destroy endpoints.

use serde::Deserialize;

use crate::domain::CoverAssetId;
use crate::domain::ports::DeleteOutcome;

#[derive(Debug, Deserialize)]
pub(super) struct UploadResponseDto {
    pub public_id: String,
}

impl UploadResponseDto {
    pub fn into_asset(self) -> Result<CoverAssetId, String> {
        CoverAssetId::new(&self.public_id).ok_or_else(|| "upload returned a blank public_id".to_owned())
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct DestroyResponseDto {
    pub result: String,
}

impl DestroyResponseDto {
    pub fn into_outcome(self) -> Result<DeleteOutcome, String> {
        match self.result.as_str() {
            "ok" => Ok(DeleteOutcome::Deleted),
            "not found" => Ok(DeleteOutcome::AlreadyGone),
            other => Err(format!("unexpected destroy result `{other}`")),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ErrorEnvelopeDto {
    pub error: ErrorDetailDto,
}

#[derive(Debug, Deserialize)]
pub(super) struct ErrorDetailDto {
    pub message: String,
}
