//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{AccountCommand, Authenticator, BookCommand, BookQuery};

/// Parameter object bundling all port implementations for HTTP handlers.
#[derive(Clone)]
pub struct HttpStatePorts {
    /// Registration, login and profile updates.
    pub accounts: Arc<dyn AccountCommand>,
    /// Token resolution for protected routes.
    pub authenticator: Arc<dyn Authenticator>,
    /// Book and page mutations.
    pub books: Arc<dyn BookCommand>,
    /// Public reads of books and pages.
    pub books_query: Arc<dyn BookQuery>,
}

/// Attributes of the `token` cookie set at login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookieSettings {
    /// Whether the cookie carries the `Secure` flag.
    pub secure: bool,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self { secure: true }
    }
}

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    /// Registration, login and profile updates.
    pub accounts: Arc<dyn AccountCommand>,
    /// Token resolution for protected routes.
    pub authenticator: Arc<dyn Authenticator>,
    /// Book and page mutations.
    pub books: Arc<dyn BookCommand>,
    /// Public reads of books and pages.
    pub books_query: Arc<dyn BookQuery>,
    /// Login cookie attributes.
    pub cookies: CookieSettings,
}

impl From<HttpStatePorts> for HttpState {
    fn from(ports: HttpStatePorts) -> Self {
        Self::new(ports, CookieSettings::default())
    }
}

impl HttpState {
    /// Construct state from the ports bundle and cookie attributes.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    ///
    /// use bookshelf::domain::{AccountService, AuthGateService, BookAggregateService};
    /// use bookshelf::domain::MediaAttachmentManager;
    /// use bookshelf::inbound::http::state::{CookieSettings, HttpState, HttpStatePorts};
    /// use bookshelf::outbound::memory::{InMemoryDocumentStore, InMemoryMediaHost};
    /// use bookshelf::outbound::security::{Argon2PasswordHasher, JwtCredentialService};
    /// use mockable::DefaultClock;
    ///
    /// let store = Arc::new(InMemoryDocumentStore::new());
    /// let credentials = Arc::new(JwtCredentialService::new(vec![7_u8; 32]));
    /// let clock = Arc::new(DefaultClock);
    /// let books = Arc::new(BookAggregateService::new(
    ///     store.clone(),
    ///     MediaAttachmentManager::new(Arc::new(InMemoryMediaHost::new("covers"))),
    ///     clock.clone(),
    /// ));
    /// let ports = HttpStatePorts {
    ///     accounts: Arc::new(AccountService::new(
    ///         store.clone(),
    ///         Arc::new(Argon2PasswordHasher::default()),
    ///         credentials.clone(),
    ///         clock.clone(),
    ///     )),
    ///     authenticator: Arc::new(AuthGateService::new(store, credentials, clock)),
    ///     books: books.clone(),
    ///     books_query: books,
    /// };
    /// let state = HttpState::new(ports, CookieSettings { secure: false });
    /// assert!(!state.cookies.secure);
    /// ```
    pub fn new(ports: HttpStatePorts, cookies: CookieSettings) -> Self {
        let HttpStatePorts {
            accounts,
            authenticator,
            books,
            books_query,
        } = ports;
        Self {
            accounts,
            authenticator,
            books,
            books_query,
            cookies,
        }
    }
}
