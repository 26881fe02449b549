//! OpenAPI schema definitions for domain types.
//!
//! Domain types remain framework-agnostic by not deriving `ToSchema`. This
//! module provides the schema definitions required for OpenAPI documentation
//! using utoipa's external schema registration.
//!
//! The schema wrappers mirror the serialised shape of their corresponding
//! domain types but live in the inbound adapter layer where framework
//! concerns belong.

#![expect(
    dead_code,
    reason = "Schema wrappers are only read by utoipa's derive output"
)]

use utoipa::ToSchema;

/// OpenAPI schema for [`crate::domain::ErrorCode`].
///
/// Stable machine-readable error codes returned in API error responses.
#[derive(ToSchema)]
#[schema(as = ErrorCode)]
pub enum ErrorCodeSchema {
    /// The request is malformed or fails validation.
    #[schema(rename = "invalid_request")]
    InvalidRequest,
    /// Authentication failed or is missing.
    #[schema(rename = "unauthorized")]
    Unauthorized,
    /// Authenticated but not the author of the target book.
    #[schema(rename = "forbidden")]
    Forbidden,
    /// The requested resource does not exist.
    #[schema(rename = "not_found")]
    NotFound,
    /// The request clashes with existing state.
    #[schema(rename = "conflict")]
    Conflict,
    /// A backing service could not be reached.
    #[schema(rename = "service_unavailable")]
    ServiceUnavailable,
    /// An unexpected error occurred on the server.
    #[schema(rename = "internal_error")]
    InternalError,
}

/// OpenAPI schema for the error envelope built from [`crate::domain::Error`].
#[derive(ToSchema)]
#[schema(as = Error)]
#[schema(rename_all = "camelCase")]
pub struct ErrorSchema {
    /// HTTP status code.
    #[schema(example = 404)]
    status: u16,
    /// Stable machine-readable error code.
    #[schema(example = "not_found")]
    code: ErrorCodeSchema,
    /// Human-readable message returned to clients.
    #[schema(example = "book not found")]
    message: String,
    /// Correlation identifier for tracing this error across systems.
    #[schema(example = "2d5f0c1e-8f4b-4c44-9a53-0e3c7c1d2a10")]
    trace_id: Option<String>,
    /// Supplementary error details for clients.
    details: Option<serde_json::Value>,
}

/// OpenAPI schema for [`crate::domain::User`].
#[derive(ToSchema)]
#[schema(as = User)]
#[schema(rename_all = "camelCase")]
pub struct UserSchema {
    /// Stable user identifier.
    #[schema(example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    id: String,
    /// Display name.
    #[schema(example = "Ada Lovelace")]
    name: String,
    /// Unique, lowercased email address.
    #[schema(example = "ada@example.com")]
    email: String,
    /// Creation instant (RFC 3339).
    created_at: String,
    /// Last modification instant (RFC 3339).
    updated_at: String,
}

/// OpenAPI schema for [`crate::domain::Book`].
#[derive(ToSchema)]
#[schema(as = Book)]
#[schema(rename_all = "camelCase")]
pub struct BookSchema {
    /// Stable book identifier.
    id: String,
    /// Title, 1 to 200 characters.
    #[schema(example = "The Analytical Engine")]
    title: String,
    /// Description, 1 to 2000 characters.
    description: String,
    /// Media host asset id of the cover image.
    cover: Option<String>,
    /// Id of the authoring user.
    author: String,
    /// Page ids in reading order.
    pages: Vec<String>,
    /// Creation instant (RFC 3339).
    created_at: String,
    /// Last modification instant (RFC 3339).
    updated_at: String,
}

/// OpenAPI schema for [`crate::domain::Page`].
#[derive(ToSchema)]
#[schema(as = Page)]
#[schema(rename_all = "camelCase")]
pub struct PageSchema {
    /// Stable page identifier.
    id: String,
    /// Title, 1 to 200 characters.
    title: String,
    /// Body text.
    content: String,
    /// Media host asset id of the cover image.
    cover: Option<String>,
    /// Creation instant (RFC 3339).
    created_at: String,
    /// Last modification instant (RFC 3339).
    updated_at: String,
}

macro_rules! envelope_schema {
    ($(#[$meta:meta])* $name:ident, $alias:ident, $data:ty) => {
        $(#[$meta])*
        #[derive(ToSchema)]
        #[schema(as = $alias)]
        pub struct $name {
            /// HTTP status code.
            status: u16,
            /// Human-readable outcome.
            message: String,
            /// Payload.
            data: $data,
        }
    };
}

envelope_schema!(
    /// Envelope carrying one user.
    UserEnvelopeSchema,
    UserEnvelope,
    UserSchema
);
envelope_schema!(
    /// Envelope carrying one book.
    BookEnvelopeSchema,
    BookEnvelope,
    BookSchema
);
envelope_schema!(
    /// Envelope carrying every book.
    BookListEnvelopeSchema,
    BookListEnvelope,
    Vec<BookSchema>
);
envelope_schema!(
    /// Envelope carrying one page.
    PageEnvelopeSchema,
    PageEnvelope,
    PageSchema
);
envelope_schema!(
    /// Envelope carrying the pages of a book.
    PageListEnvelopeSchema,
    PageListEnvelope,
    Vec<PageSchema>
);
envelope_schema!(
    /// Envelope carrying a freshly issued token.
    TokenEnvelopeSchema,
    TokenEnvelope,
    TokenSchema
);
envelope_schema!(
    /// Envelope carrying the asset id of a new cover.
    CoverEnvelopeSchema,
    CoverEnvelope,
    String
);
envelope_schema!(
    /// Envelope of operations that return nothing.
    EmptyEnvelopeSchema,
    EmptyEnvelope,
    Option<String>
);

/// Login response payload.
#[derive(ToSchema)]
#[schema(as = Token)]
pub struct TokenSchema {
    /// Bearer token, also set as the `token` cookie.
    token: String,
}
