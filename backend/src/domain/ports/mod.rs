//! Domain ports for the hexagonal boundary.
//!
//! Driven ports ([`DocumentStore`], [`MediaHost`], [`CredentialService`],
//! [`PasswordHasher`]) are implemented by outbound adapters. Driving ports
//! ([`AccountCommand`], [`Authenticator`], [`BookCommand`], [`BookQuery`]) are
//! implemented by domain services and consumed by inbound adapters.

mod macros;
pub(crate) use macros::define_port_error;

mod account_command;
mod authenticator;
mod book_command;
mod book_query;
mod credential_service;
mod document_store;
mod media_host;
mod password_hasher;

#[cfg(test)]
pub use account_command::MockAccountCommand;
pub use account_command::AccountCommand;
#[cfg(test)]
pub use authenticator::MockAuthenticator;
pub use authenticator::Authenticator;
#[cfg(test)]
pub use book_command::MockBookCommand;
pub use book_command::BookCommand;
#[cfg(test)]
pub use book_query::MockBookQuery;
pub use book_query::BookQuery;
#[cfg(test)]
pub use credential_service::MockCredentialService;
pub use credential_service::{CredentialError, CredentialService};
#[cfg(test)]
pub use document_store::MockDocumentStore;
pub use document_store::{
    Document, DocumentStore, DocumentStoreError, Filter, ID_FIELD, Projection, ReturnDocument,
    Update, UpdateError, UpdateOutcome,
};
#[cfg(test)]
pub use media_host::MockMediaHost;
pub use media_host::{DeleteOutcome, MediaHost, MediaHostError};
#[cfg(test)]
pub use password_hasher::MockPasswordHasher;
pub use password_hasher::{PasswordHashError, PasswordHasher};
