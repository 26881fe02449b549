//! In-process adapters used by tests and by servers started without a
//! database URL or media credentials.
//!
//! Both adapters keep state behind a mutex and never touch the network.

mod document_store;
mod media_host;

pub use document_store::InMemoryDocumentStore;
pub use media_host::InMemoryMediaHost;
