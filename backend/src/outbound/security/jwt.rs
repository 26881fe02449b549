//! HS256 JSON Web Tokens carrying the user id as `sub`.
//!
//! Expiry is checked against the caller-supplied `now` rather than the
//! system clock, so `validate_exp` is disabled on the library side.

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::domain::ports::{CredentialError, CredentialService};
use crate::domain::{BearerToken, TokenClaims, UserId};

/// Shortest signing secret accepted in release builds.
pub const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
    jti: String,
}

/// Token issuer and validator keyed by a shared secret.
pub struct JwtCredentialService {
    secret: Zeroizing<Vec<u8>>,
    validation: Validation,
}

impl JwtCredentialService {
    /// Build the service over `secret`.
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["sub", "exp"]);
        Self {
            secret: Zeroizing::new(secret.into()),
            validation,
        }
    }
}

impl std::fmt::Debug for JwtCredentialService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtCredentialService")
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl CredentialService for JwtCredentialService {
    fn issue(
        &self,
        subject: &UserId,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<BearerToken, CredentialError> {
        let claims = Claims {
            sub: subject.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        let key = EncodingKey::from_secret(&self.secret);
        let encoded = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &key)
            .map_err(|err| CredentialError::issue(err.to_string()))?;
        BearerToken::new(encoded).ok_or_else(|| CredentialError::issue("encoder produced no token"))
    }

    fn validate(
        &self,
        token: &BearerToken,
        now: DateTime<Utc>,
    ) -> Result<TokenClaims, CredentialError> {
        let key = DecodingKey::from_secret(&self.secret);
        let data = jsonwebtoken::decode::<Claims>(token.as_str(), &key, &self.validation)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => CredentialError::expired(),
                _ => {
                    debug!(error = %err, "token failed to decode");
                    CredentialError::invalid(err.to_string())
                }
            })?;
        let claims = data.claims;
        if claims.exp <= now.timestamp() {
            return Err(CredentialError::expired());
        }
        let subject = UserId::new(&claims.sub)
            .map_err(|err| CredentialError::invalid(format!("subject: {err}")))?;
        let expires_at = DateTime::from_timestamp(claims.exp, 0)
            .ok_or_else(|| CredentialError::invalid("expiry out of range"))?;
        Ok(TokenClaims {
            subject,
            expires_at,
        })
    }
}
