//! Account registration, login and profile updates.
//!
//! Email uniqueness is enforced by the store's unique index on
//! `users.email`. The lookup before insert only exists to answer the common
//! case without hashing a password first.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::{debug, info, warn};

use super::ports::{
    AccountCommand, CredentialService, DocumentStore, DocumentStoreError, Filter, PasswordHasher,
    Projection, ReturnDocument, Update,
};
use super::records::{self, UserRecord, USERS, fields};
use super::{
    Error, IssuedToken, LoginCredentials, Registration, StoredUser, User, UserId, UserName,
    token_lifetime,
};

const EMAIL_TAKEN: &str = "user with email already exists";

/// Account use cases backed by the document store.
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn DocumentStore>,
    hasher: Arc<dyn PasswordHasher>,
    credentials: Arc<dyn CredentialService>,
    clock: Arc<dyn Clock>,
}

impl AccountService {
    /// Build the service over its collaborators.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        hasher: Arc<dyn PasswordHasher>,
        credentials: Arc<dyn CredentialService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            hasher,
            credentials,
            clock,
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<StoredUser>, Error> {
        self.store
            .find_one(USERS, &Filter::eq(fields::EMAIL, email), &Projection::full())
            .await
            .map_err(records::map_store_error)?
            .map(records::decode::<UserRecord, StoredUser>)
            .transpose()
    }
}

fn email_taken() -> Error {
    Error::conflict(EMAIL_TAKEN).with_details(json!({"field": "email", "code": "email_taken"}))
}

#[async_trait]
impl AccountCommand for AccountService {
    async fn register(&self, registration: Registration) -> Result<User, Error> {
        if self
            .find_by_email(registration.email().as_ref())
            .await?
            .is_some()
        {
            return Err(email_taken());
        }

        let hash = self
            .hasher
            .hash(registration.password())
            .await
            .map_err(|err| {
                warn!(error = %err, "password hashing failed");
                Error::internal(err.to_string())
            })?;

        let now = self.clock.utc();
        let user = User::new(
            UserId::random(),
            registration.name().clone(),
            registration.email().clone(),
            now,
            now,
        );
        let document = records::encode(&UserRecord::new(&user, &hash))?;
        match self.store.insert_one(USERS, document).await {
            Ok(()) => {
                info!(user_id = %user.id(), "account registered");
                Ok(user)
            }
            Err(DocumentStoreError::DuplicateKey { field, .. }) => {
                debug!(%field, "unique index rejected registration");
                Err(email_taken())
            }
            Err(err) => Err(records::map_store_error(err)),
        }
    }

    async fn login(&self, credentials: LoginCredentials) -> Result<IssuedToken, Error> {
        let stored = self
            .find_by_email(credentials.email().as_ref())
            .await?
            .ok_or_else(|| Error::not_found("user not found"))?;

        let matches = self
            .hasher
            .verify(credentials.password(), &stored.password_hash)
            .await
            .map_err(|err| {
                warn!(error = %err, user_id = %stored.user.id(), "password verification failed");
                Error::internal(err.to_string())
            })?;
        if !matches {
            debug!(user_id = %stored.user.id(), "login rejected");
            return Err(Error::unauthorized("invalid credentials"));
        }

        let issued_at = self.clock.utc();
        let expires_at = issued_at + token_lifetime();
        let token = self
            .credentials
            .issue(stored.user.id(), issued_at, expires_at)
            .map_err(|err| Error::internal(err.to_string()))?;
        info!(user_id = %stored.user.id(), "login succeeded");
        Ok(IssuedToken { token, expires_at })
    }

    async fn update_profile(&self, user: &User, name: UserName) -> Result<User, Error> {
        let update = Update::new()
            .set(fields::NAME, name.as_ref())
            .set(fields::UPDATED_AT, records::timestamp(self.clock.utc()));
        let document = self
            .store
            .find_one_and_update(
                USERS,
                &Filter::by_id(user.id()),
                &update,
                ReturnDocument::After,
            )
            .await
            .map_err(records::map_store_error)?
            .ok_or_else(|| Error::internal("failed to update user"))?;
        let updated = records::decode::<UserRecord, User>(document)?;
        info!(user_id = %updated.id(), "profile updated");
        Ok(updated)
    }
}

#[cfg(test)]
#[path = "account_service_tests.rs"]
mod tests;
