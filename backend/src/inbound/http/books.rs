//! Book API handlers.
//!
//! ```text
//! GET /api/v1/books
//! GET /api/v1/books/{bookId}
//! POST /api/v1/books {"title":"...","description":"...","cover":"optional-asset-id"}
//! PUT /api/v1/books/{bookId} {"title":"...","description":"..."}
//! DELETE /api/v1/books/{bookId}
//! ```
//!
//! Reads are public. Mutations require a token and authorship of the book.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, delete, get, post, put, web};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{BookDraft, BookPatch};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::AuthenticatedUser;
use crate::inbound::http::envelope::{respond, respond_empty};
use crate::inbound::http::schemas::{
    BookEnvelopeSchema, BookListEnvelopeSchema, EmptyEnvelopeSchema, ErrorSchema,
};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{map_field_error, parse_book_id};

/// Request body for `POST /api/v1/books`.
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(default)]
pub struct CreateBookRequest {
    pub title: String,
    pub description: String,
    /// Asset id of a cover uploaded beforehand.
    pub cover: Option<String>,
}

/// Request body for `PUT /api/v1/books/{bookId}`. Blank or absent fields are
/// left unchanged.
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(default)]
pub struct UpdateBookRequest {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// List every book.
#[utoipa::path(
    get,
    path = "/api/v1/books",
    responses(
        (status = 200, description = "Books retrieved", body = BookListEnvelopeSchema),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["books"],
    operation_id = "listBooks",
    security([])
)]
#[get("/books")]
pub async fn list_books(state: web::Data<HttpState>) -> ApiResult<HttpResponse> {
    let books = state.books_query.list_books().await?;
    Ok(respond(StatusCode::OK, "Books retrieved", books))
}

/// Fetch one book.
#[utoipa::path(
    get,
    path = "/api/v1/books/{bookId}",
    params(("bookId" = String, Path, description = "Book identifier")),
    responses(
        (status = 200, description = "Book retrieved", body = BookEnvelopeSchema),
        (status = 400, description = "Malformed book id", body = ErrorSchema),
        (status = 404, description = "Book not found", body = ErrorSchema)
    ),
    tags = ["books"],
    operation_id = "getBook",
    security([])
)]
#[get("/books/{book_id}")]
pub async fn get_book(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let book_id = parse_book_id(&path)?;
    let book = state.books_query.get_book(&book_id).await?;
    Ok(respond(StatusCode::OK, "Book retrieved", book))
}

/// Create a book authored by the caller.
#[utoipa::path(
    post,
    path = "/api/v1/books",
    request_body = CreateBookRequest,
    responses(
        (status = 201, description = "Book created", body = BookEnvelopeSchema),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Not logged in", body = ErrorSchema),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["books"],
    operation_id = "createBook"
)]
#[post("/books")]
pub async fn create_book(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    payload: web::Json<CreateBookRequest>,
) -> ApiResult<HttpResponse> {
    let draft = BookDraft::try_from_parts(
        &payload.title,
        &payload.description,
        payload.cover.as_deref(),
    )
    .map_err(map_field_error)?;
    let book = state.books.create_book(user.user(), draft).await?;
    info!(book_id = %book.id, author = %book.author, "book created");
    Ok(respond(StatusCode::CREATED, "Book created", book))
}

/// Update the title or description of a book.
#[utoipa::path(
    put,
    path = "/api/v1/books/{bookId}",
    params(("bookId" = String, Path, description = "Book identifier")),
    request_body = UpdateBookRequest,
    responses(
        (status = 200, description = "Updated book", body = BookEnvelopeSchema),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Not logged in or not the author", body = ErrorSchema),
        (status = 404, description = "Book not found", body = ErrorSchema)
    ),
    tags = ["books"],
    operation_id = "updateBook"
)]
#[put("/books/{book_id}")]
pub async fn update_book(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    path: web::Path<String>,
    payload: web::Json<UpdateBookRequest>,
) -> ApiResult<HttpResponse> {
    let book_id = parse_book_id(&path)?;
    let patch = BookPatch::try_from_parts(
        payload.title.as_deref(),
        payload.description.as_deref(),
    )
    .map_err(map_field_error)?;
    let book = state.books.update_book(user.user(), &book_id, patch).await?;
    Ok(respond(StatusCode::OK, "Updated book", book))
}

/// Delete a book together with its pages.
#[utoipa::path(
    delete,
    path = "/api/v1/books/{bookId}",
    params(("bookId" = String, Path, description = "Book identifier")),
    responses(
        (status = 200, description = "Book deleted", body = EmptyEnvelopeSchema),
        (status = 401, description = "Not logged in or not the author", body = ErrorSchema),
        (status = 404, description = "Book not found", body = ErrorSchema),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["books"],
    operation_id = "deleteBook"
)]
#[delete("/books/{book_id}")]
pub async fn delete_book(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let book_id = parse_book_id(&path)?;
    state.books.delete_book(user.user(), &book_id).await?;
    info!(%book_id, "book deleted");
    Ok(respond_empty(StatusCode::OK, "Book deleted"))
}
