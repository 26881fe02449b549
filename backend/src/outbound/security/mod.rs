//! Credential adapters: HMAC-signed bearer tokens and Argon2 password hashes.

mod argon2;
mod jwt;

pub use self::argon2::Argon2PasswordHasher;
pub use self::jwt::{JwtCredentialService, MIN_SECRET_LEN};
