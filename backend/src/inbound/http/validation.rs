//! Shared validation helpers for inbound HTTP adapters.
//!
//! Every helper produces an `invalid_request` error whose details name the
//! offending payload field and a stable machine-readable code.

use serde_json::json;

use crate::domain::{
    BookId, CredentialValidationError, Error, FieldValidationError, PageId, UserValidationError,
};

/// Validation error codes for HTTP request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    Blank,
    TooLong,
    TooShort,
    InvalidUuid,
    InvalidEmail,
    EmptyUpload,
    MissingField,
}

impl ErrorCode {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Blank => "blank",
            Self::TooLong => "too_long",
            Self::TooShort => "too_short",
            Self::InvalidUuid => "invalid_uuid",
            Self::InvalidEmail => "invalid_email",
            Self::EmptyUpload => "empty_upload",
            Self::MissingField => "missing_field",
        }
    }
}

/// Newtype wrapper for HTTP field names to provide type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    const fn as_str(self) -> &'static str {
        self.0
    }
}

pub(crate) const BOOK_ID: FieldName = FieldName::new("bookId");
pub(crate) const PAGE_ID: FieldName = FieldName::new("pageId");
pub(crate) const COVER: FieldName = FieldName::new("cover");

fn field_error(field: FieldName, code: ErrorCode, message: impl Into<String>) -> Error {
    Error::invalid_request(message).with_details(json!({
        "field": field.as_str(),
        "code": code.as_str(),
    }))
}

fn invalid_id(field: FieldName, message: &str, value: &str) -> Error {
    Error::invalid_request(message).with_details(json!({
        "field": field.as_str(),
        "value": value,
        "code": ErrorCode::InvalidUuid.as_str(),
    }))
}

/// Parse a book id taken from the request path.
pub(crate) fn parse_book_id(raw: &str) -> Result<BookId, Error> {
    BookId::new(raw).map_err(|_| invalid_id(BOOK_ID, "invalid book id", raw))
}

/// Parse a page id taken from the request path.
pub(crate) fn parse_page_id(raw: &str) -> Result<PageId, Error> {
    PageId::new(raw).map_err(|_| invalid_id(PAGE_ID, "invalid page id", raw))
}

pub(crate) fn missing_field_error(field: FieldName) -> Error {
    let name = field.as_str();
    field_error(field, ErrorCode::MissingField, format!("missing required field: {name}"))
}

pub(crate) fn empty_upload_error() -> Error {
    field_error(COVER, ErrorCode::EmptyUpload, "cover must not be empty")
}

pub(crate) fn upload_too_large_error(max_bytes: usize) -> Error {
    field_error(
        COVER,
        ErrorCode::TooLong,
        format!("cover must be at most {max_bytes} bytes"),
    )
}

pub(crate) fn map_field_error(err: FieldValidationError) -> Error {
    let code = match err {
        FieldValidationError::Blank { .. } => ErrorCode::Blank,
        FieldValidationError::TooLong { .. } => ErrorCode::TooLong,
    };
    field_error(FieldName::new(err.field()), code, err.to_string())
}

fn user_error_code(err: &UserValidationError) -> ErrorCode {
    match err {
        UserValidationError::EmptyName | UserValidationError::EmptyEmail => ErrorCode::Blank,
        UserValidationError::NameTooLong { .. } => ErrorCode::TooLong,
        UserValidationError::InvalidEmail => ErrorCode::InvalidEmail,
    }
}

pub(crate) fn map_user_error(err: UserValidationError) -> Error {
    let field = match err {
        UserValidationError::EmptyName | UserValidationError::NameTooLong { .. } => "name",
        UserValidationError::EmptyEmail | UserValidationError::InvalidEmail => "email",
    };
    field_error(FieldName::new(field), user_error_code(&err), err.to_string())
}

pub(crate) fn map_credential_error(err: CredentialValidationError) -> Error {
    let code = match &err {
        CredentialValidationError::User(user) => user_error_code(user),
        CredentialValidationError::EmptyPassword => ErrorCode::Blank,
        CredentialValidationError::PasswordTooShort { .. } => ErrorCode::TooShort,
        CredentialValidationError::PasswordTooLong { .. } => ErrorCode::TooLong,
    };
    field_error(FieldName::new(err.field()), code, err.to_string())
}
