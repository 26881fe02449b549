//! PostgreSQL persistence via Diesel and `diesel-async`.
//!
//! Documents are stored as JSONB rows in a single `documents` table; see
//! [`DieselDocumentStore`] for how filters and updates are translated.
//!
//! ```ignore
//! use bookshelf::outbound::persistence::{DbPool, DieselDocumentStore, PoolConfig};
//!
//! run_pending_migrations(&url).await?;
//! let pool = DbPool::new(PoolConfig::new(url)).await?;
//! let store = DieselDocumentStore::new(pool);
//! ```

mod diesel_document_store;
mod diesel_error_mapping;
mod migrations;
mod pool;

pub use diesel_document_store::DieselDocumentStore;
pub use migrations::{MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
