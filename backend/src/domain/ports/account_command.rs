//! Driving port for account registration, login and profile changes.

use async_trait::async_trait;

use crate::domain::{Error, IssuedToken, LoginCredentials, Registration, User, UserName};

/// Account use cases exposed to inbound adapters.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountCommand: Send + Sync {
    /// Create an account. Fails with `conflict` when the email is taken.
    async fn register(&self, registration: Registration) -> Result<User, Error>;

    /// Check credentials and issue a bearer token.
    async fn login(&self, credentials: LoginCredentials) -> Result<IssuedToken, Error>;

    /// Rename the calling user.
    async fn update_profile(&self, user: &User, name: UserName) -> Result<User, Error>;
}
