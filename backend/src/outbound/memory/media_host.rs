//! Media host that keeps uploads in a map keyed by generated asset id.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::CoverAssetId;
use crate::domain::ports::{DeleteOutcome, MediaHost, MediaHostError};

/// In-process stand-in for the remote media host.
#[derive(Default)]
pub struct InMemoryMediaHost {
    assets: Mutex<HashMap<String, usize>>,
    folder: String,
}

impl InMemoryMediaHost {
    /// Host that prefixes asset ids with `folder/`.
    pub fn new(folder: impl Into<String>) -> Self {
        Self {
            assets: Mutex::default(),
            folder: folder.into(),
        }
    }

    /// Whether `asset` is currently stored.
    pub fn contains(&self, asset: &CoverAssetId) -> bool {
        self.lock()
            .map(|assets| assets.contains_key(asset.as_str()))
            .unwrap_or_default()
    }

    /// Number of stored assets.
    pub fn len(&self) -> usize {
        self.lock().map(|assets| assets.len()).unwrap_or_default()
    }

    /// Whether no assets are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, usize>>, MediaHostError> {
        self.assets
            .lock()
            .map_err(|_| MediaHostError::transport("in-memory media host lock poisoned"))
    }
}

#[async_trait]
impl MediaHost for InMemoryMediaHost {
    async fn ping(&self) -> Result<(), MediaHostError> {
        self.lock().map(|_| ())
    }

    async fn upload(&self, bytes: Vec<u8>) -> Result<CoverAssetId, MediaHostError> {
        let name = Uuid::new_v4().simple().to_string();
        let id = if self.folder.is_empty() {
            name
        } else {
            format!("{}/{name}", self.folder)
        };
        self.lock()?.insert(id.clone(), bytes.len());
        CoverAssetId::new(id).ok_or_else(|| MediaHostError::decode("generated blank asset id"))
    }

    async fn delete(&self, asset: &CoverAssetId) -> Result<DeleteOutcome, MediaHostError> {
        Ok(match self.lock()?.remove(asset.as_str()) {
            Some(_) => DeleteOutcome::Deleted,
            None => DeleteOutcome::AlreadyGone,
        })
    }
}
