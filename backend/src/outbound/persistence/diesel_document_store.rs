//! PostgreSQL-backed document store: one JSONB row per document.
//!
//! All collections share the `documents` table keyed by `(collection, id)`.
//! Filters become a JSONB containment test plus optional id clauses. Updates
//! lock the matched row, run [`Update::apply`] in Rust and write the body
//! back, so they evaluate exactly like the in-memory adapter.

use std::sync::OnceLock;

use async_trait::async_trait;
use diesel::sql_types::{Array, Jsonb, Nullable, Text};
use diesel::{OptionalExtension, QueryableByName, sql_query};
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use super::diesel_error_mapping::{map_diesel_error, map_pool_error, unique_index_name};
use super::pool::DbPool;
use crate::domain::ports::{
    Document, DocumentStore, DocumentStoreError, Filter, ID_FIELD, Projection, ReturnDocument,
    Update, UpdateOutcome,
};

macro_rules! selector_sql {
    () => {
        "collection = $1 AND body @> $2 \
         AND ($3::text IS NULL OR id = $3) \
         AND ($4::text[] IS NULL OR id = ANY($4))"
    };
}

macro_rules! bind_selector {
    ($query:expr, $selector:expr) => {
        $query
            .bind::<Text, _>($selector.collection)
            .bind::<Jsonb, _>(&$selector.contains)
            .bind::<Nullable<Text>, _>($selector.id.as_deref())
            .bind::<Nullable<Array<Text>>, _>($selector.ids.as_deref())
    };
}

const FIND_SQL: &str = concat!(
    "SELECT id, body FROM documents WHERE ",
    selector_sql!(),
    " ORDER BY seq"
);
const FIND_ONE_SQL: &str = concat!(
    "SELECT id, body FROM documents WHERE ",
    selector_sql!(),
    " ORDER BY seq LIMIT 1"
);
const LOCK_ONE_SQL: &str = concat!(
    "SELECT id, body FROM documents WHERE ",
    selector_sql!(),
    " ORDER BY seq LIMIT 1 FOR UPDATE"
);
const DELETE_ONE_SQL: &str = concat!(
    "WITH target AS (SELECT id FROM documents WHERE ",
    selector_sql!(),
    " ORDER BY seq LIMIT 1 FOR UPDATE) \
     DELETE FROM documents d USING target \
     WHERE d.collection = $1 AND d.id = target.id \
     RETURNING d.id, d.body"
);
const DELETE_MANY_SQL: &str = concat!("DELETE FROM documents WHERE ", selector_sql!());
const INSERT_SQL: &str = "INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3)";
const REPLACE_BODY_SQL: &str = "UPDATE documents SET body = $3 WHERE collection = $1 AND id = $2";

#[derive(QueryableByName)]
struct DocumentRow {
    #[diesel(sql_type = Text)]
    id: String,
    #[diesel(sql_type = Jsonb)]
    body: Value,
}

impl DocumentRow {
    fn into_document(self) -> Result<Document, DocumentStoreError> {
        match self.body {
            Value::Object(document) => Ok(document),
            _ => Err(DocumentStoreError::invalid_document(format!(
                "row {} does not hold a JSON object",
                self.id
            ))),
        }
    }
}

/// A [`Filter`] split into SQL bind values.
#[derive(Debug, PartialEq)]
struct Selector<'a> {
    collection: &'a str,
    contains: Value,
    id: Option<String>,
    ids: Option<Vec<String>>,
}

impl<'a> Selector<'a> {
    fn new(collection: &'a str, filter: &Filter) -> Self {
        let mut contains = filter.equals().clone();
        let id = match contains.remove(ID_FIELD) {
            Some(Value::String(id)) => Some(id),
            Some(other) => {
                // Non-string ids never match a stored row; keep the clause so
                // the containment test fails instead of matching everything.
                contains.insert(ID_FIELD.to_owned(), other);
                None
            }
            None => None,
        };
        Self {
            collection,
            contains: Value::Object(contains),
            id,
            ids: filter.ids().map(<[String]>::to_vec),
        }
    }
}

enum TxError {
    Diesel(diesel::result::Error),
    Store(DocumentStoreError),
}

impl From<diesel::result::Error> for TxError {
    fn from(error: diesel::result::Error) -> Self {
        Self::Diesel(error)
    }
}

impl TxError {
    fn into_store_error(self, collection: &str) -> DocumentStoreError {
        match self {
            Self::Diesel(error) => map_diesel_error(error, collection),
            Self::Store(error) => error,
        }
    }
}

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z][A-Za-z0-9]*(?:_[A-Za-z0-9]+)*$")
            .unwrap_or_else(|err| panic!("identifier pattern is valid: {err}"))
    })
}

fn check_identifier(kind: &str, value: &str) -> Result<(), DocumentStoreError> {
    if identifier_pattern().is_match(value) {
        Ok(())
    } else {
        Err(DocumentStoreError::query(format!(
            "invalid {kind} name `{value}` for a unique index"
        )))
    }
}

/// Document store persisting JSON documents in PostgreSQL.
#[derive(Clone)]
pub struct DieselDocumentStore {
    pool: DbPool,
}

impl DieselDocumentStore {
    /// Wrap a connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Lock the first match, apply `update`, and write it back.
    async fn modify(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<Option<(Document, Document, bool)>, DocumentStoreError> {
        let selector = Selector::new(collection, filter);
        let mut pooled = self.pool.get().await.map_err(map_pool_error)?;
        let conn: &mut AsyncPgConnection = &mut pooled;
        let selector = &selector;

        conn.transaction::<_, TxError, _>(|conn| {
            async move {
                let Some(row) = bind_selector!(sql_query(LOCK_ONE_SQL), selector)
                    .get_result::<DocumentRow>(conn)
                    .await
                    .optional()?
                else {
                    return Ok(None);
                };
                let id = row.id.clone();
                let before = row.into_document().map_err(TxError::Store)?;
                let mut after = before.clone();
                let modified = update.apply(&mut after).map_err(|err| {
                    TxError::Store(DocumentStoreError::invalid_document(err.to_string()))
                })?;
                if modified {
                    sql_query(REPLACE_BODY_SQL)
                        .bind::<Text, _>(collection)
                        .bind::<Text, _>(&id)
                        .bind::<Jsonb, _>(Value::Object(after.clone()))
                        .execute(conn)
                        .await?;
                }
                Ok(Some((before, after, modified)))
            }
            .scope_boxed()
        })
        .await
        .map_err(|err| err.into_store_error(collection))
    }
}

#[async_trait]
impl DocumentStore for DieselDocumentStore {
    async fn ensure_unique_index(
        &self,
        collection: &str,
        field: &str,
    ) -> Result<(), DocumentStoreError> {
        check_identifier("collection", collection)?;
        check_identifier("field", field)?;
        let statement = format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS \"{name}\" ON documents ((body ->> '{field}')) \
             WHERE collection = '{collection}'",
            name = unique_index_name(collection, field),
        );
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        sql_query(statement)
            .execute(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, collection))?;
        debug!(collection, field, "unique index ensured");
        Ok(())
    }

    async fn ping(&self) -> Result<(), DocumentStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        sql_query("SELECT 1")
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|err| map_diesel_error(err, "documents"))
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
        projection: &Projection,
    ) -> Result<Option<Document>, DocumentStoreError> {
        let selector = Selector::new(collection, filter);
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        bind_selector!(sql_query(FIND_ONE_SQL), selector)
            .get_result::<DocumentRow>(&mut conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error(err, collection))?
            .map(|row| row.into_document().map(|document| projection.apply(document)))
            .transpose()
    }

    async fn find_many(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Vec<Document>, DocumentStoreError> {
        let selector = Selector::new(collection, filter);
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        bind_selector!(sql_query(FIND_SQL), selector)
            .load::<DocumentRow>(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, collection))?
            .into_iter()
            .map(DocumentRow::into_document)
            .collect()
    }

    async fn insert_one(
        &self,
        collection: &str,
        document: Document,
    ) -> Result<(), DocumentStoreError> {
        let id = match document.get(ID_FIELD) {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            _ => {
                return Err(DocumentStoreError::invalid_document(
                    "documents require a string `_id`",
                ));
            }
        };
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        sql_query(INSERT_SQL)
            .bind::<Text, _>(collection)
            .bind::<Text, _>(&id)
            .bind::<Jsonb, _>(Value::Object(document))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|err| map_diesel_error(err, collection))
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<UpdateOutcome, DocumentStoreError> {
        Ok(match self.modify(collection, filter, update).await? {
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
        Ok(self
            .modify(collection, filter, update)
            .await?
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
        let selector = Selector::new(collection, filter);
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        bind_selector!(sql_query(DELETE_ONE_SQL), selector)
            .get_result::<DocumentRow>(&mut conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error(err, collection))?
            .map(DocumentRow::into_document)
            .transpose()
    }

    async fn delete_many(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<u64, DocumentStoreError> {
        let selector = Selector::new(collection, filter);
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let removed = bind_selector!(sql_query(DELETE_MANY_SQL), selector)
            .execute(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, collection))?;
        Ok(removed as u64)
    }
}
