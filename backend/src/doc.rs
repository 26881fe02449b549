//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every HTTP endpoint of the inbound layer, the schema
//! wrappers from [`crate::inbound::http::schemas`] and the two ways of
//! presenting a token: the `token` cookie set at login and an
//! `Authorization: Bearer` header.
//!
//! Served by Swagger UI in debug builds and printed by the `openapi-dump`
//! binary.

use crate::inbound::http::books::{CreateBookRequest, UpdateBookRequest};
use crate::inbound::http::pages::{CreatePageRequest, UpdatePageRequest};
use crate::inbound::http::schemas::{
    BookEnvelopeSchema, BookListEnvelopeSchema, BookSchema, CoverEnvelopeSchema,
    EmptyEnvelopeSchema, ErrorCodeSchema, ErrorSchema, PageEnvelopeSchema,
    PageListEnvelopeSchema, PageSchema, TokenEnvelopeSchema, TokenSchema, UserEnvelopeSchema,
    UserSchema,
};
use crate::inbound::http::users::{CreateAccountRequest, LoginRequest, UpdateUserRequest};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Name of the cookie security scheme.
pub const TOKEN_COOKIE_SCHEME: &str = "TokenCookie";
/// Name of the bearer header security scheme.
pub const BEARER_SCHEME: &str = "BearerAuth";

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            TOKEN_COOKIE_SCHEME,
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "token",
                "HTTP-only cookie set by POST /api/v1/users/login.",
            ))),
        );
        components.add_security_scheme(
            BEARER_SCHEME,
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .description(Some("Token returned in the login response body."))
                    .build(),
            ),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Bookshelf API",
        description = "Accounts, books, pages and cover images of the bookshelf."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("TokenCookie" = []), ("BearerAuth" = [])),
    paths(
        crate::inbound::http::users::create_account,
        crate::inbound::http::users::login,
        crate::inbound::http::users::logout,
        crate::inbound::http::users::current_user,
        crate::inbound::http::users::update_user,
        crate::inbound::http::books::list_books,
        crate::inbound::http::books::get_book,
        crate::inbound::http::books::create_book,
        crate::inbound::http::books::update_book,
        crate::inbound::http::books::delete_book,
        crate::inbound::http::pages::list_pages,
        crate::inbound::http::pages::get_page,
        crate::inbound::http::pages::add_page,
        crate::inbound::http::pages::update_page,
        crate::inbound::http::pages::delete_page,
        crate::inbound::http::covers::change_book_cover,
        crate::inbound::http::covers::change_page_cover,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        ErrorSchema,
        ErrorCodeSchema,
        UserSchema,
        BookSchema,
        PageSchema,
        TokenSchema,
        UserEnvelopeSchema,
        BookEnvelopeSchema,
        BookListEnvelopeSchema,
        PageEnvelopeSchema,
        PageListEnvelopeSchema,
        TokenEnvelopeSchema,
        CoverEnvelopeSchema,
        EmptyEnvelopeSchema,
        CreateAccountRequest,
        LoginRequest,
        UpdateUserRequest,
        CreateBookRequest,
        UpdateBookRequest,
        CreatePageRequest,
        UpdatePageRequest,
    )),
    tags(
        (name = "users", description = "Accounts and login"),
        (name = "books", description = "Books and their metadata"),
        (name = "pages", description = "Pages nested under a book"),
        (name = "covers", description = "Cover image uploads"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
