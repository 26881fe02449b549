//! Shared test doubles for domain service tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use mockable::Clock;

use crate::domain::ports::{
    DeleteOutcome, Document, DocumentStore, DocumentStoreError, Filter, ID_FIELD, MediaHost, MediaHostError,
    PasswordHashError, PasswordHasher, Projection, ReturnDocument, Update, UpdateOutcome,
};
use crate::domain::records::{BOOKS, PAGES, fields};
use crate::domain::{CoverAssetId, PasswordHash};
use crate::outbound::memory::InMemoryDocumentStore;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Fixed instant used by service tests.
pub fn fixture_timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53)
        .single()
        .expect("valid fixture timestamp")
}

/// Clock that only moves when told to.
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn advance_seconds(&self, seconds: i64) {
        *lock(&self.0) += TimeDelta::seconds(seconds);
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *lock(&self.0)
    }
}

/// Store operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    FindOne,
    FindMany,
    Insert,
    Update,
    FindAndUpdate,
    DeleteOne,
    DeleteMany,
}

/// In-memory store that fails selected operations on selected collections.
#[derive(Default)]
pub struct FaultyStore {
    inner: InMemoryDocumentStore,
    failures: Mutex<HashSet<(StoreOp, String)>>,
    calls: Mutex<Vec<(StoreOp, String)>>,
    late_page: Mutex<Option<(String, Document)>>,
}

impl FaultyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail(&self, op: StoreOp, collection: &str) {
        lock(&self.failures).insert((op, collection.to_owned()));
    }

    /// Insert `page` and append it to `book` right before the next book
    /// deletion, as a concurrent AddPage would.
    pub fn add_page_before_book_delete(&self, book: impl ToString, page: Document) {
        *lock(&self.late_page) = Some((book.to_string(), page));
    }

    async fn apply_late_page(&self) -> Result<(), DocumentStoreError> {
        let late = lock(&self.late_page).take();
        let Some((book, page)) = late else {
            return Ok(());
        };
        let id = page.get(ID_FIELD).cloned().unwrap_or_default();
        self.inner.insert_one(PAGES, page).await?;
        self.inner
            .update_one(BOOKS, &Filter::by_id(book), &Update::new().push(fields::PAGES, id))
            .await
            .map(|_| ())
    }

    pub fn heal(&self) {
        lock(&self.failures).clear();
    }

    /// Mutating calls observed so far, in order.
    pub fn writes(&self) -> Vec<(StoreOp, String)> {
        lock(&self.calls)
            .iter()
            .filter(|(op, _)| !matches!(op, StoreOp::FindOne | StoreOp::FindMany))
            .cloned()
            .collect()
    }

    pub async fn count(&self, collection: &str) -> usize {
        self.inner
            .find_many(collection, &Filter::all())
            .await
            .map(|docs| docs.len())
            .unwrap_or_default()
    }

    fn check(&self, op: StoreOp, collection: &str) -> Result<(), DocumentStoreError> {
        lock(&self.calls).push((op, collection.to_owned()));
        if lock(&self.failures).contains(&(op, collection.to_owned())) {
            return Err(DocumentStoreError::query(format!(
                "injected {op:?} failure on {collection}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FaultyStore {
    async fn ensure_unique_index(
        &self,
        collection: &str,
        field: &str,
    ) -> Result<(), DocumentStoreError> {
        self.inner.ensure_unique_index(collection, field).await
    }

    async fn ping(&self) -> Result<(), DocumentStoreError> {
        self.inner.ping().await
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
        projection: &Projection,
    ) -> Result<Option<Document>, DocumentStoreError> {
        self.check(StoreOp::FindOne, collection)?;
        self.inner.find_one(collection, filter, projection).await
    }

    async fn find_many(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Vec<Document>, DocumentStoreError> {
        self.check(StoreOp::FindMany, collection)?;
        self.inner.find_many(collection, filter).await
    }

    async fn insert_one(
        &self,
        collection: &str,
        document: Document,
    ) -> Result<(), DocumentStoreError> {
        self.check(StoreOp::Insert, collection)?;
        self.inner.insert_one(collection, document).await
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<UpdateOutcome, DocumentStoreError> {
        self.check(StoreOp::Update, collection)?;
        self.inner.update_one(collection, filter, update).await
    }

    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
        returning: ReturnDocument,
    ) -> Result<Option<Document>, DocumentStoreError> {
        self.check(StoreOp::FindAndUpdate, collection)?;
        self.inner
            .find_one_and_update(collection, filter, update, returning)
            .await
    }

    async fn delete_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, DocumentStoreError> {
        self.check(StoreOp::DeleteOne, collection)?;
        if collection == BOOKS {
            self.apply_late_page().await?;
        }
        self.inner.delete_one(collection, filter).await
    }

    async fn delete_many(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<u64, DocumentStoreError> {
        self.check(StoreOp::DeleteMany, collection)?;
        self.inner.delete_many(collection, filter).await
    }
}

/// Reversible "hash" that keeps service tests fast.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainHasher;

#[async_trait]
impl PasswordHasher for PlainHasher {
    async fn hash(&self, password: &str) -> Result<PasswordHash, PasswordHashError> {
        Ok(PasswordHash::new(format!("plain${password}")))
    }

    async fn verify(&self, password: &str, hash: &PasswordHash) -> Result<bool, PasswordHashError> {
        hash.as_str()
            .strip_prefix("plain$")
            .map(|stored| stored == password)
            .ok_or_else(|| PasswordHashError::malformed_hash("missing plain$ prefix"))
    }
}

/// Media host that records every call and can be told to fail.
#[derive(Default)]
pub struct RecordingMediaHost {
    events: Mutex<Vec<String>>,
    fail_uploads: Mutex<bool>,
    counter: Mutex<u32>,
}

impl RecordingMediaHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<String> {
        lock(&self.events).clone()
    }

    pub fn fail_uploads(&self, fail: bool) {
        *lock(&self.fail_uploads) = fail;
    }
}

#[async_trait]
impl MediaHost for RecordingMediaHost {
    async fn ping(&self) -> Result<(), MediaHostError> {
        Ok(())
    }

    async fn upload(&self, _bytes: Vec<u8>) -> Result<CoverAssetId, MediaHostError> {
        if *lock(&self.fail_uploads) {
            return Err(MediaHostError::transport("host offline"));
        }
        let id = {
            let mut counter = lock(&self.counter);
            *counter += 1;
            format!("asset-{}", *counter)
        };
        lock(&self.events).push(format!("upload {id}"));
        CoverAssetId::new(id).ok_or_else(|| MediaHostError::decode("blank asset id"))
    }

    async fn delete(&self, asset: &CoverAssetId) -> Result<DeleteOutcome, MediaHostError> {
        lock(&self.events).push(format!("delete {asset}"));
        Ok(DeleteOutcome::Deleted)
    }
}
