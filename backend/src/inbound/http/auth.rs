//! Request authentication for protected handlers.
//!
//! Handlers that require a caller declare an [`AuthenticatedUser`] parameter;
//! the extractor resolves the presented token before the handler body runs,
//! so an unauthenticated request never reaches domain code.

use actix_web::cookie::{Cookie, SameSite, time::Duration};
use actix_web::http::header;
use actix_web::{FromRequest, HttpRequest, dev::Payload, web};
use futures_util::future::LocalBoxFuture;
use tracing::error;

use crate::domain::{BearerToken, Error, IssuedToken, TOKEN_LIFETIME_HOURS, User};

use super::state::{CookieSettings, HttpState};

/// Name of the cookie carrying the bearer token.
pub const TOKEN_COOKIE: &str = "token";

const NOT_LOGGED_IN: &str = "you are not logged in";
const BEARER_PREFIX: &str = "Bearer ";

/// User resolved from the request's token.
///
/// The wrapped user never carries password material.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(User);

impl AuthenticatedUser {
    /// The authenticated caller.
    #[must_use]
    pub const fn user(&self) -> &User {
        &self.0
    }

    /// Unwrap the authenticated caller.
    #[must_use]
    pub fn into_inner(self) -> User {
        self.0
    }
}

/// Token from the `token` cookie, falling back to `Authorization: Bearer`.
fn presented_token(req: &HttpRequest) -> Option<BearerToken> {
    if let Some(token) = req
        .cookie(TOKEN_COOKIE)
        .and_then(|cookie| BearerToken::new(cookie.value()))
    {
        return Some(token);
    }
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
        .and_then(BearerToken::new)
}

impl FromRequest for AuthenticatedUser {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<HttpState>>().cloned();
        let token = presented_token(req);
        Box::pin(async move {
            let Some(state) = state else {
                error!("HttpState missing from app data");
                return Err(Error::internal("http state not configured").into());
            };
            let token = token.ok_or_else(|| Error::unauthorized(NOT_LOGGED_IN))?;
            let user = state.authenticator.authenticate(&token).await?;
            Ok(Self(user))
        })
    }
}

/// Cookie handing the issued token to browsers.
pub(crate) fn token_cookie(issued: &IssuedToken, settings: CookieSettings) -> Cookie<'static> {
    Cookie::build(TOKEN_COOKIE, issued.token.as_str().to_owned())
        .path("/")
        .http_only(true)
        .secure(settings.secure)
        .same_site(SameSite::Lax)
        .max_age(Duration::hours(TOKEN_LIFETIME_HOURS))
        .finish()
}

/// Expired cookie that makes browsers drop the token.
pub(crate) fn removal_cookie(settings: CookieSettings) -> Cookie<'static> {
    let mut cookie = Cookie::build(TOKEN_COOKIE, "")
        .path("/")
        .http_only(true)
        .secure(settings.secure)
        .same_site(SameSite::Lax)
        .finish();
    cookie.make_removal();
    cookie
}
