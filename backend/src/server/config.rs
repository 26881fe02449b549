//! HTTP server configuration object and helpers.

use std::net::SocketAddr;

use bookshelf::inbound::http::state::CookieSettings;
use bookshelf::outbound::media::CloudinaryConfig;
use bookshelf::outbound::persistence::DbPool;
use zeroize::Zeroizing;

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) cookies: CookieSettings,
    pub(crate) token_secret: Zeroizing<Vec<u8>>,
    pub(crate) media_folder: String,
    pub(crate) db_pool: Option<DbPool>,
    pub(crate) media: Option<CloudinaryConfig>,
}

impl ServerConfig {
    /// Construct a configuration backed by in-memory adapters.
    #[must_use]
    pub fn new(
        bind_addr: SocketAddr,
        cookies: CookieSettings,
        token_secret: Zeroizing<Vec<u8>>,
        media_folder: impl Into<String>,
    ) -> Self {
        Self {
            bind_addr,
            cookies,
            token_secret,
            media_folder: media_folder.into(),
            db_pool: None,
            media: None,
        }
    }

    /// Persist documents in PostgreSQL instead of memory.
    #[must_use]
    pub fn with_db_pool(mut self, pool: DbPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    /// Store covers on Cloudinary instead of memory.
    #[must_use]
    pub fn with_media(mut self, media: CloudinaryConfig) -> Self {
        self.media = Some(media);
        self
    }

    /// Return the socket address the server will bind to.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}
