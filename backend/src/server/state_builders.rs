//! Builders for the adapters and services behind the HTTP state.

use std::io;
use std::sync::Arc;

use actix_web::web;
use mockable::{Clock, DefaultClock};
use tracing::{info, warn};

use bookshelf::domain::ports::{DocumentStore, MediaHost};
use bookshelf::domain::records::{USERS, fields};
use bookshelf::domain::{
    AccountService, AuthGateService, BookAggregateService, MediaAttachmentManager,
};
use bookshelf::inbound::http::state::{HttpState, HttpStatePorts};
use bookshelf::outbound::media::CloudinaryMediaHost;
use bookshelf::outbound::memory::{InMemoryDocumentStore, InMemoryMediaHost};
use bookshelf::outbound::persistence::DieselDocumentStore;
use bookshelf::outbound::security::{Argon2PasswordHasher, JwtCredentialService};

use super::ServerConfig;

/// Driven adapters shared by every worker.
pub(crate) struct Adapters {
    pub(crate) store: Arc<dyn DocumentStore>,
    pub(crate) media: Arc<dyn MediaHost>,
    pub(crate) clock: Arc<dyn Clock>,
}

/// Choose the document store and media host from the configuration.
///
/// # Errors
/// Returns [`io::Error`] when the media HTTP client cannot be built.
pub(crate) fn build_adapters(config: &mut ServerConfig) -> io::Result<Adapters> {
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);

    let store: Arc<dyn DocumentStore> = match config.db_pool.clone() {
        Some(pool) => Arc::new(DieselDocumentStore::new(pool)),
        None => {
            warn!("no database configured; documents are kept in memory");
            Arc::new(InMemoryDocumentStore::new())
        }
    };

    let media: Arc<dyn MediaHost> = match config.media.take() {
        Some(media) => Arc::new(
            CloudinaryMediaHost::new(media, clock.clone())
                .map_err(|err| io::Error::other(format!("media client: {err}")))?,
        ),
        None => {
            warn!("no media credentials configured; covers are kept in memory");
            Arc::new(InMemoryMediaHost::new(config.media_folder.clone()))
        }
    };

    Ok(Adapters {
        store,
        media,
        clock,
    })
}

/// Check connectivity and create the unique email index.
///
/// # Errors
/// Returns [`io::Error`] when either backend is unreachable or the index
/// cannot be created.
pub(crate) async fn prepare_adapters(adapters: &Adapters) -> io::Result<()> {
    adapters
        .store
        .ping()
        .await
        .map_err(|err| io::Error::other(format!("document store unavailable: {err}")))?;
    adapters
        .store
        .ensure_unique_index(USERS, fields::EMAIL)
        .await
        .map_err(|err| io::Error::other(format!("unique email index: {err}")))?;
    adapters
        .media
        .ping()
        .await
        .map_err(|err| io::Error::other(format!("media host unavailable: {err}")))?;
    info!("backing services reachable");
    Ok(())
}

/// Wire domain services onto the adapters.
pub(crate) fn build_http_state(config: &ServerConfig, adapters: &Adapters) -> web::Data<HttpState> {
    let credentials = Arc::new(JwtCredentialService::new(config.token_secret.to_vec()));
    let Adapters {
        store,
        media,
        clock,
    } = adapters;

    let accounts = Arc::new(AccountService::new(
        store.clone(),
        Arc::new(Argon2PasswordHasher::default()),
        credentials.clone(),
        clock.clone(),
    ));
    let authenticator = Arc::new(AuthGateService::new(
        store.clone(),
        credentials,
        clock.clone(),
    ));
    let books = Arc::new(BookAggregateService::new(
        store.clone(),
        MediaAttachmentManager::new(media.clone()),
        clock.clone(),
    ));

    web::Data::new(HttpState::new(
        HttpStatePorts {
            accounts,
            authenticator,
            books: books.clone(),
            books_query: books,
        },
        config.cookies,
    ))
}
