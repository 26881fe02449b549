//! Stored document shapes for users, books and pages.
//!
//! Records mirror the persisted JSON (camelCase, primary key under `_id`) and
//! hold raw strings. Converting a record into a domain type re-validates it,
//! so a corrupted document surfaces as an internal error instead of leaking
//! into a response.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::error;

use super::ports::{Document, DocumentStoreError};
use super::{
    Book, BookDescription, BookId, BookTitle, CoverAssetId, EmailAddress, Error, Page, PageContent,
    PageId, PageTitle, PasswordHash, StoredUser, User, UserId, UserName,
};

/// Collection holding user documents.
pub const USERS: &str = "users";
/// Collection holding book documents.
pub const BOOKS: &str = "books";
/// Collection holding page documents.
pub const PAGES: &str = "pages";

/// Field names used in filters and updates.
pub mod fields {
    /// Login email, unique across users.
    pub const EMAIL: &str = "email";
    /// User display name.
    pub const NAME: &str = "name";
    /// Password hash; projected out of outward reads.
    pub const PASSWORD: &str = "password";
    /// Book or page title.
    pub const TITLE: &str = "title";
    /// Book description.
    pub const DESCRIPTION: &str = "description";
    /// Page body.
    pub const CONTENT: &str = "content";
    /// Cover asset id.
    pub const COVER: &str = "cover";
    /// Ordered page ids of a book.
    pub const PAGES: &str = "pages";
    /// Last modification timestamp.
    pub const UPDATED_AT: &str = "updatedAt";
}

/// Failure to turn a stored document into a domain value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("stored {kind} is invalid: {message}")]
pub struct RecordError {
    kind: &'static str,
    message: String,
}

impl RecordError {
    fn new(kind: &'static str, message: impl ToString) -> Self {
        Self {
            kind,
            message: message.to_string(),
        }
    }
}

/// Persisted user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    password: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRecord {
    /// Record for a newly registered user.
    #[must_use]
    pub fn new(user: &User, password_hash: &PasswordHash) -> Self {
        Self {
            id: user.id().to_string(),
            name: user.name().to_string(),
            email: user.email().to_string(),
            password: Some(password_hash.as_str().to_owned()),
            created_at: user.created_at(),
            updated_at: user.updated_at(),
        }
    }
}

impl TryFrom<UserRecord> for User {
    type Error = RecordError;

    fn try_from(record: UserRecord) -> Result<Self, Self::Error> {
        let invalid = |err: &dyn std::fmt::Display| RecordError::new("user", err);
        Ok(Self::new(
            UserId::new(&record.id).map_err(|err| invalid(&err))?,
            UserName::new(&record.name).map_err(|err| invalid(&err))?,
            EmailAddress::new(&record.email).map_err(|err| invalid(&err))?,
            record.created_at,
            record.updated_at,
        ))
    }
}

impl TryFrom<UserRecord> for StoredUser {
    type Error = RecordError;

    fn try_from(mut record: UserRecord) -> Result<Self, Self::Error> {
        let hash = record
            .password
            .take()
            .ok_or_else(|| RecordError::new("user", "password hash is missing"))?;
        Ok(Self {
            user: User::try_from(record)?,
            password_hash: PasswordHash::new(hash),
        })
    }
}

/// Persisted book.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookRecord {
    #[serde(rename = "_id")]
    id: String,
    title: String,
    description: String,
    #[serde(default)]
    cover: Option<String>,
    author: String,
    #[serde(default)]
    pages: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<&Book> for BookRecord {
    fn from(book: &Book) -> Self {
        Self {
            id: book.id.to_string(),
            title: book.title.as_ref().to_owned(),
            description: book.description.as_ref().to_owned(),
            cover: book.cover.as_ref().map(ToString::to_string),
            author: book.author.to_string(),
            pages: book.pages.iter().map(ToString::to_string).collect(),
            created_at: book.created_at,
            updated_at: book.updated_at,
        }
    }
}

impl TryFrom<BookRecord> for Book {
    type Error = RecordError;

    fn try_from(record: BookRecord) -> Result<Self, Self::Error> {
        let invalid = |err: &dyn std::fmt::Display| RecordError::new("book", err);
        let pages = record
            .pages
            .iter()
            .map(|id| PageId::new(id).map_err(|err| invalid(&err)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            id: BookId::new(&record.id).map_err(|err| invalid(&err))?,
            title: BookTitle::new(&record.title).map_err(|err| invalid(&err))?,
            description: BookDescription::new(&record.description).map_err(|err| invalid(&err))?,
            cover: record.cover.and_then(CoverAssetId::new),
            author: UserId::new(&record.author).map_err(|err| invalid(&err))?,
            pages,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

/// Persisted page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRecord {
    #[serde(rename = "_id")]
    id: String,
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    cover: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<&Page> for PageRecord {
    fn from(page: &Page) -> Self {
        Self {
            id: page.id.to_string(),
            title: page.title.as_ref().to_owned(),
            content: page.content.as_ref().to_owned(),
            cover: page.cover.as_ref().map(ToString::to_string),
            created_at: page.created_at,
            updated_at: page.updated_at,
        }
    }
}

impl TryFrom<PageRecord> for Page {
    type Error = RecordError;

    fn try_from(record: PageRecord) -> Result<Self, Self::Error> {
        let invalid = |err: &dyn std::fmt::Display| RecordError::new("page", err);
        Ok(Self {
            id: PageId::new(&record.id).map_err(|err| invalid(&err))?,
            title: PageTitle::new(&record.title).map_err(|err| invalid(&err))?,
            content: PageContent::new(&record.content).map_err(|err| invalid(&err))?,
            cover: record.cover.and_then(CoverAssetId::new),
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

/// Timestamp in the RFC 3339 form records are stored with.
#[must_use]
pub fn timestamp(at: DateTime<Utc>) -> Value {
    Value::String(at.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

/// Serialise a record into a document.
pub fn encode<R: Serialize>(record: &R) -> Result<Document, Error> {
    match serde_json::to_value(record) {
        Ok(Value::Object(document)) => Ok(document),
        Ok(_) => Err(Error::internal("record did not serialise to an object")),
        Err(err) => Err(Error::internal(format!("record serialisation failed: {err}"))),
    }
}

/// Deserialise a document through its record type into a domain value.
pub fn decode<R, T>(document: Document) -> Result<T, Error>
where
    R: DeserializeOwned,
    T: TryFrom<R, Error = RecordError>,
{
    let record: R = serde_json::from_value(Value::Object(document)).map_err(|err| {
        error!(error = %err, "stored document does not match its record shape");
        Error::internal("stored document is malformed")
    })?;
    T::try_from(record).map_err(|err| {
        error!(error = %err, "stored document failed validation");
        Error::internal("stored document is invalid")
    })
}

/// Map a store failure to a domain error, logging the cause.
pub fn map_store_error(error: DocumentStoreError) -> Error {
    match error {
        DocumentStoreError::Connection { message } => {
            error!(%message, "document store unavailable");
            Error::service_unavailable("document store unavailable")
        }
        other => {
            error!(error = %other, "document store operation failed");
            Error::internal(other.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BookDraft, PageDraft};
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    fn book_documents_use_camel_case_and_underscore_id() {
        let draft = BookDraft::try_from_parts("Dune", "Spice", Some("cover-1")).expect("valid");
        let book = Book::create(draft, UserId::random(), Utc::now());

        let document = encode(&BookRecord::from(&book)).expect("encodes");

        assert_eq!(document.get("_id"), Some(&json!(book.id.to_string())));
        assert!(document.contains_key("createdAt"));
        assert_eq!(document.get("cover"), Some(&json!("cover-1")));
        let decoded: Book = decode::<BookRecord, _>(document).expect("decodes");
        assert_eq!(decoded, book);
    }

    #[rstest]
    fn pages_decode_without_optional_fields() {
        let page = Page::create(
            PageDraft::try_from_parts("One", None).expect("valid"),
            Utc::now(),
        );
        let mut document = encode(&PageRecord::from(&page)).expect("encodes");
        document.remove("content");
        document.remove("cover");

        let decoded: Page = decode::<PageRecord, _>(document).expect("decodes");
        assert_eq!(decoded.content.as_ref(), "");
    }

    #[rstest]
    fn stored_user_requires_a_password_hash() {
        let now = Utc::now();
        let document = json!({
            "_id": UserId::random().to_string(),
            "name": "Ada",
            "email": "ada@example.com",
            "createdAt": now,
            "updatedAt": now,
        });
        let Value::Object(document) = document else {
            panic!("fixture is an object");
        };
        let user: User = decode::<UserRecord, _>(document.clone()).expect("profile decodes");
        assert_eq!(user.name().as_ref(), "Ada");
        let error = decode::<UserRecord, StoredUser>(document).expect_err("hash required");
        assert_eq!(error.code(), crate::domain::ErrorCode::InternalError);
    }

    #[rstest]
    fn timestamps_match_the_serde_encoding() {
        let now = Utc::now();
        assert_eq!(timestamp(now), serde_json::to_value(now).expect("serialises"));
    }

    #[rstest]
    fn connection_failures_are_service_unavailable() {
        let error = map_store_error(DocumentStoreError::connection("refused"));
        assert_eq!(error.code(), crate::domain::ErrorCode::ServiceUnavailable);
        let error = map_store_error(DocumentStoreError::query("syntax"));
        assert_eq!(error.code(), crate::domain::ErrorCode::InternalError);
    }
}
