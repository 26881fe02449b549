//! Domain primitives, aggregates and services.
//!
//! Purpose: define the strongly typed entities of the bookshelf (users, books
//! and pages), the ports through which they are persisted, and the services
//! that enforce ownership and cross-document consistency. Nothing in here
//! depends on actix or on a concrete database.
//!
//! Public surface:
//! - [`Error`] / [`ErrorCode`]: transport-agnostic failure payload.
//! - [`User`], [`Book`], [`Page`]: outward entities.
//! - [`AccountService`], [`AuthGateService`], [`BookAggregateService`]:
//!   implementations of the driving ports in [`ports`].

pub mod account_service;
pub mod auth;
pub mod auth_gate;
pub mod book;
pub mod book_service;
pub mod error;
pub mod ids;
pub mod media;
pub mod ports;
pub mod records;
pub mod trace_id;
pub mod user;

pub use self::account_service::AccountService;
pub use self::auth::{
    BearerToken, CredentialValidationError, IssuedToken, LoginCredentials, PASSWORD_MAX,
    PASSWORD_MIN, Registration, TOKEN_LIFETIME_HOURS, TokenClaims, token_lifetime,
};
pub use self::auth_gate::AuthGateService;
pub use self::book::{
    Book, BookDescription, BookDraft, BookPatch, BookTitle, CoverTarget, FieldValidationError,
    Page, PageContent, PageDraft, PagePatch, PageTitle,
};
pub use self::book_service::BookAggregateService;
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::ids::{BookId, IdValidationError, PageId, UserId};
pub use self::media::{CoverAssetId, CoverChange, MediaAttachmentManager, RetiredAsset};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::user::{
    EmailAddress, PasswordHash, StoredUser, USER_NAME_MAX, User, UserName, UserValidationError,
};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use bookshelf::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::forbidden("nope"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
