//! Translation of pool and Diesel failures into [`DocumentStoreError`].

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use super::pool::PoolError;
use crate::domain::ports::{DocumentStoreError, ID_FIELD};

/// Prefix of unique index names created by `ensure_unique_index`.
pub(super) const UNIQUE_INDEX_PREFIX: &str = "documents_uq__";

/// Name of the unique index on `collection.field`.
pub(super) fn unique_index_name(collection: &str, field: &str) -> String {
    format!("{UNIQUE_INDEX_PREFIX}{collection}__{field}")
}

/// Recover `(collection, field)` from a unique index name.
fn parse_unique_index(name: &str) -> Option<(&str, &str)> {
    name.strip_prefix(UNIQUE_INDEX_PREFIX)?.split_once("__")
}

pub(super) fn map_pool_error(error: PoolError) -> DocumentStoreError {
    DocumentStoreError::connection(error.message())
}

/// Map a Diesel error raised while writing to `collection`.
pub(super) fn map_diesel_error(error: DieselError, collection: &str) -> DocumentStoreError {
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(error = %error, "diesel operation failed"),
    }

    match error {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            match info.constraint_name().and_then(parse_unique_index) {
                Some((indexed, field)) => DocumentStoreError::duplicate_key(indexed, field),
                None => DocumentStoreError::duplicate_key(collection, ID_FIELD),
            }
        }
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            DocumentStoreError::connection("database connection closed")
        }
        DieselError::DatabaseError(_, info) => DocumentStoreError::query(info.message()),
        DieselError::SerializationError(err) | DieselError::DeserializationError(err) => {
            DocumentStoreError::invalid_document(err.to_string())
        }
        other => DocumentStoreError::query(other.to_string()),
    }
}
