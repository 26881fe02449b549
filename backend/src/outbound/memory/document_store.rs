//! Mutex-guarded document collections with unique-index enforcement.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::ports::{
    Document, DocumentStore, DocumentStoreError, Filter, ID_FIELD, Projection, ReturnDocument,
    Update, UpdateOutcome,
};

#[derive(Default)]
struct State {
    collections: HashMap<String, Vec<Document>>,
    unique: HashMap<String, BTreeSet<String>>,
}

impl State {
    fn documents(&self, collection: &str) -> &[Document] {
        self.collections
            .get(collection)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn position(&self, collection: &str, filter: &Filter) -> Option<usize> {
        self.documents(collection)
            .iter()
            .position(|document| filter.matches(document))
    }

    /// Reject `candidate` if another document (other than `skip`) already
    /// holds the same `_id` or the same value for a unique field.
    fn check_unique(
        &self,
        collection: &str,
        candidate: &Document,
        skip: Option<usize>,
    ) -> Result<(), DocumentStoreError> {
        let mut fields: Vec<&str> = vec![ID_FIELD];
        if let Some(unique) = self.unique.get(collection) {
            fields.extend(unique.iter().map(String::as_str));
        }
        for field in fields {
            let Some(value) = candidate.get(field).filter(|value| !value.is_null()) else {
                continue;
            };
            let clash = self
                .documents(collection)
                .iter()
                .enumerate()
                .any(|(index, existing)| Some(index) != skip && existing.get(field) == Some(value));
            if clash {
                return Err(DocumentStoreError::duplicate_key(collection, field));
            }
        }
        Ok(())
    }

    /// Apply `update` to the first match, returning the before and after
    /// versions of the document.
    fn modify(
        &mut self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<Option<(Document, Document, bool)>, DocumentStoreError> {
        let Some(index) = self.position(collection, filter) else {
            return Ok(None);
        };
        let before = self.documents(collection)[index].clone();
        let mut after = before.clone();
        let modified = update
            .apply(&mut after)
            .map_err(|err| DocumentStoreError::invalid_document(err.to_string()))?;
        if modified {
            self.check_unique(collection, &after, Some(index))?;
            if let Some(documents) = self.collections.get_mut(collection) {
                documents[index] = after.clone();
            }
        }
        Ok(Some((before, after, modified)))
    }
}

/// Document store held entirely in process memory.
///
/// Documents keep insertion order, which is the order `find_many` returns.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    state: Mutex<State>,
}

impl InMemoryDocumentStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, DocumentStoreError> {
        self.state
            .lock()
            .map_err(|_| DocumentStoreError::query("in-memory store lock poisoned"))
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn ensure_unique_index(
        &self,
        collection: &str,
        field: &str,
    ) -> Result<(), DocumentStoreError> {
        let mut state = self.lock()?;
        let mut seen = BTreeSet::new();
        for document in state.documents(collection) {
            if let Some(value) = document.get(field).filter(|value| !value.is_null())
                && !seen.insert(value.to_string())
            {
                return Err(DocumentStoreError::duplicate_key(collection, field));
            }
        }
        state
            .unique
            .entry(collection.to_owned())
            .or_default()
            .insert(field.to_owned());
        Ok(())
    }

    async fn ping(&self) -> Result<(), DocumentStoreError> {
        self.lock().map(|_| ())
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
        projection: &Projection,
    ) -> Result<Option<Document>, DocumentStoreError> {
        let state = self.lock()?;
        Ok(state
            .documents(collection)
            .iter()
            .find(|document| filter.matches(document))
            .map(|document| projection.apply(document.clone())))
    }

    async fn find_many(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Vec<Document>, DocumentStoreError> {
        let state = self.lock()?;
        Ok(state
            .documents(collection)
            .iter()
            .filter(|document| filter.matches(document))
            .cloned()
            .collect())
    }

    async fn insert_one(
        &self,
        collection: &str,
        document: Document,
    ) -> Result<(), DocumentStoreError> {
        if !matches!(document.get(ID_FIELD), Some(Value::String(id)) if !id.is_empty()) {
            return Err(DocumentStoreError::invalid_document(
                "documents require a string `_id`",
            ));
        }
        let mut state = self.lock()?;
        state.check_unique(collection, &document, None)?;
        state
            .collections
            .entry(collection.to_owned())
            .or_default()
            .push(document);
        Ok(())
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<UpdateOutcome, DocumentStoreError> {
        let mut state = self.lock()?;
        Ok(match state.modify(collection, filter, update)? {
            Some((_, _, modified)) => UpdateOutcome {
                matched: 1,
                modified: u64::from(modified),
            },
            None => UpdateOutcome::default(),
        })
    }

    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
        returning: ReturnDocument,
    ) -> Result<Option<Document>, DocumentStoreError> {
        let mut state = self.lock()?;
        Ok(state
            .modify(collection, filter, update)?
            .map(|(before, after, _)| match returning {
                ReturnDocument::Before => before,
                ReturnDocument::After => after,
            }))
    }

    async fn delete_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, DocumentStoreError> {
        let mut state = self.lock()?;
        let Some(index) = state.position(collection, filter) else {
            return Ok(None);
        };
        Ok(state
            .collections
            .get_mut(collection)
            .map(|documents| documents.remove(index)))
    }

    async fn delete_many(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<u64, DocumentStoreError> {
        let mut state = self.lock()?;
        let Some(documents) = state.collections.get_mut(collection) else {
            return Ok(0);
        };
        let before = documents.len();
        documents.retain(|document| !filter.matches(document));
        Ok((before - documents.len()) as u64)
    }
}
