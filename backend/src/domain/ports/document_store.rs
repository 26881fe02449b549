//! Port for the generic document store and the filter/update expressions it
//! understands.
//!
//! Documents are JSON objects keyed by a string `_id`. Filters match on
//! top-level scalar equality plus an optional id set; updates combine field
//! assignment with array push/pull. Both adapters evaluate [`Update`] through
//! [`Update::apply`] so their semantics cannot drift apart.

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::define_port_error;

/// JSON object stored in a collection.
pub type Document = Map<String, Value>;

/// Field holding a document's primary key.
pub const ID_FIELD: &str = "_id";

define_port_error! {
    /// Errors raised by document store adapters.
    pub enum DocumentStoreError {
        /// The store could not be reached.
        Connection { message: String } => "document store connection failed: {message}",
        /// A query or mutation failed during execution.
        Query { message: String } => "document store query failed: {message}",
        /// A unique index rejected the write.
        DuplicateKey { collection: String, field: String } =>
            "duplicate value for unique field {collection}.{field}",
        /// A document or update could not be encoded or applied.
        InvalidDocument { message: String } => "invalid document: {message}",
    }
}

/// Match expression for documents in a collection.
///
/// An empty filter matches every document.
///
/// # Examples
/// ```
/// use bookshelf::domain::ports::Filter;
/// use serde_json::json;
///
/// let filter = Filter::eq("email", "ada@example.com");
/// let doc = json!({"_id": "1", "email": "ada@example.com"});
/// assert!(filter.matches(doc.as_object().unwrap()));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    equals: Map<String, Value>,
    ids: Option<Vec<String>>,
}

impl Filter {
    /// Filter matching every document.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Filter on the primary key.
    pub fn by_id(id: impl ToString) -> Self {
        Self::eq(ID_FIELD, id.to_string())
    }

    /// Filter on equality of a single top-level field.
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self::default().and_eq(field, value)
    }

    /// Add another equality clause.
    #[must_use]
    pub fn and_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.equals.insert(field.to_owned(), value.into());
        self
    }

    /// Filter on membership of the primary key in `ids`.
    pub fn id_in<I, T>(ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToString,
    {
        Self {
            equals: Map::new(),
            ids: Some(ids.into_iter().map(|id| id.to_string()).collect()),
        }
    }

    /// Equality clauses.
    #[must_use]
    pub const fn equals(&self) -> &Map<String, Value> {
        &self.equals
    }

    /// Primary key set, when the filter restricts by id.
    #[must_use]
    pub fn ids(&self) -> Option<&[String]> {
        self.ids.as_deref()
    }

    /// Evaluate the filter against a document.
    #[must_use]
    pub fn matches(&self, document: &Document) -> bool {
        let equals_match = self
            .equals
            .iter()
            .all(|(field, expected)| document.get(field) == Some(expected));
        let id_match = self.ids.as_ref().is_none_or(|ids| {
            document
                .get(ID_FIELD)
                .and_then(Value::as_str)
                .is_some_and(|id| ids.iter().any(|candidate| candidate == id))
        });
        equals_match && id_match
    }
}

/// Failure to apply an [`Update`] to a document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpdateError {
    /// Updates may not rewrite the primary key.
    #[error("the `_id` field is immutable")]
    ImmutableId,
    /// Push or pull targeted a field that is not an array.
    #[error("field `{field}` is not an array")]
    NotAnArray {
        /// Offending field.
        field: String,
    },
}

/// Mutation applied to a matched document.
///
/// # Examples
/// ```
/// use bookshelf::domain::ports::Update;
/// use serde_json::json;
///
/// let mut doc = json!({"_id": "b1", "pages": ["p1"]}).as_object().unwrap().clone();
/// let modified = Update::new().push("pages", "p2").apply(&mut doc).unwrap();
/// assert!(modified);
/// assert_eq!(doc["pages"], json!(["p1", "p2"]));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    set: Map<String, Value>,
    push: Vec<(String, Value)>,
    pull: Vec<(String, Value)>,
}

impl Update {
    /// Empty update.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign `value` to `field`.
    #[must_use]
    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.set.insert(field.to_owned(), value.into());
        self
    }

    /// Append `value` to the array at `field`, creating it when absent.
    #[must_use]
    pub fn push(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.push.push((field.to_owned(), value.into()));
        self
    }

    /// Remove every occurrence of `value` from the array at `field`.
    #[must_use]
    pub fn pull(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.pull.push((field.to_owned(), value.into()));
        self
    }

    /// Whether the update contains no operations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.push.is_empty() && self.pull.is_empty()
    }

    /// Apply the update in place, returning whether the document changed.
    pub fn apply(&self, document: &mut Document) -> Result<bool, UpdateError> {
        let mut modified = false;
        for (field, value) in &self.set {
            if field == ID_FIELD {
                return Err(UpdateError::ImmutableId);
            }
            if document.get(field) != Some(value) {
                document.insert(field.clone(), value.clone());
                modified = true;
            }
        }
        for (field, value) in &self.push {
            let entry = document
                .entry(field.clone())
                .or_insert_with(|| Value::Array(Vec::new()));
            let array = entry
                .as_array_mut()
                .ok_or_else(|| UpdateError::NotAnArray {
                    field: field.clone(),
                })?;
            array.push(value.clone());
            modified = true;
        }
        for (field, value) in &self.pull {
            let Some(entry) = document.get_mut(field) else {
                continue;
            };
            let array = entry
                .as_array_mut()
                .ok_or_else(|| UpdateError::NotAnArray {
                    field: field.clone(),
                })?;
            let before = array.len();
            array.retain(|item| item != value);
            modified |= array.len() != before;
        }
        Ok(modified)
    }
}

/// Which version of the document a find-and-modify call returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnDocument {
    /// The document as it was before the update.
    Before,
    /// The document after the update was applied.
    After,
}

/// Counts reported by [`DocumentStore::update_one`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// Documents matched by the filter (0 or 1).
    pub matched: u64,
    /// Documents whose content changed (0 or 1).
    pub modified: u64,
}

/// Top-level fields stripped from query results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    exclude: Vec<String>,
}

impl Projection {
    /// Return documents unchanged.
    #[must_use]
    pub fn full() -> Self {
        Self::default()
    }

    /// Drop the named fields.
    #[must_use]
    pub fn excluding(fields: &[&str]) -> Self {
        Self {
            exclude: fields.iter().map(|field| (*field).to_owned()).collect(),
        }
    }

    /// Apply the projection to a document.
    #[must_use]
    pub fn apply(&self, mut document: Document) -> Document {
        for field in &self.exclude {
            document.remove(field);
        }
        document
    }
}

/// Generic document persistence over named collections.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a unique index on a top-level field if it does not exist.
    async fn ensure_unique_index(
        &self,
        collection: &str,
        field: &str,
    ) -> Result<(), DocumentStoreError>;

    /// Check connectivity.
    async fn ping(&self) -> Result<(), DocumentStoreError>;

    /// Fetch the first matching document.
    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
        projection: &Projection,
    ) -> Result<Option<Document>, DocumentStoreError>;

    /// Fetch all matching documents in insertion order.
    async fn find_many(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Vec<Document>, DocumentStoreError>;

    /// Insert a new document. The `_id` field is required.
    async fn insert_one(&self, collection: &str, document: Document)
    -> Result<(), DocumentStoreError>;

    /// Apply `update` to the first matching document.
    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<UpdateOutcome, DocumentStoreError>;

    /// Apply `update` to the first matching document and return it.
    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
        returning: ReturnDocument,
    ) -> Result<Option<Document>, DocumentStoreError>;

    /// Delete the first matching document and return it.
    async fn delete_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, DocumentStoreError>;

    /// Delete every matching document, returning the count.
    async fn delete_many(&self, collection: &str, filter: &Filter)
    -> Result<u64, DocumentStoreError>;
}
