//! Driving port resolving a bearer token to the user it was issued to.

use async_trait::async_trait;

use crate::domain::{BearerToken, Error, User};

/// Resolves tokens presented by clients.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Validate `token` and load its user without credential material.
    ///
    /// Every failure is reported as [`crate::domain::ErrorCode::Unauthorized`].
    async fn authenticate(&self, token: &BearerToken) -> Result<User, Error>;
}
