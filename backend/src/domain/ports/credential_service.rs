//! Port for issuing and validating bearer tokens.

use chrono::{DateTime, Utc};

use crate::domain::{BearerToken, TokenClaims, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised while issuing or validating tokens.
    pub enum CredentialError {
        /// The token's expiry has passed.
        Expired => "token has expired",
        /// The token is malformed or its signature does not verify.
        Invalid { message: String } => "token is invalid: {message}",
        /// A token could not be produced.
        Issue { message: String } => "token could not be issued: {message}",
    }
}

/// Issues opaque, time-bound tokens bound to a user id.
///
/// Time is passed in explicitly so callers control the clock.
#[cfg_attr(test, mockall::automock)]
pub trait CredentialService: Send + Sync {
    /// Issue a token for `subject` valid until `expires_at`.
    fn issue(
        &self,
        subject: &UserId,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<BearerToken, CredentialError>;

    /// Verify a token's signature and expiry as of `now`.
    fn validate(
        &self,
        token: &BearerToken,
        now: DateTime<Utc>,
    ) -> Result<TokenClaims, CredentialError>;
}
