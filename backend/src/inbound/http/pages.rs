//! Page API handlers, nested under their book.
//!
//! ```text
//! GET /api/v1/books/{bookId}/pages
//! GET /api/v1/books/{bookId}/pages/{pageId}
//! POST /api/v1/books/{bookId}/pages {"title":"...","content":"..."}
//! PUT /api/v1/books/{bookId}/pages/{pageId} {"title":"...","content":"..."}
//! DELETE /api/v1/books/{bookId}/pages/{pageId}
//! ```

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, delete, get, post, put, web};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{BookId, Error, PageDraft, PageId, PagePatch};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::AuthenticatedUser;
use crate::inbound::http::envelope::{respond, respond_empty};
use crate::inbound::http::schemas::{
    EmptyEnvelopeSchema, ErrorSchema, PageEnvelopeSchema, PageListEnvelopeSchema,
};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{map_field_error, parse_book_id, parse_page_id};

/// Request body for `POST /api/v1/books/{bookId}/pages`.
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(default)]
pub struct CreatePageRequest {
    pub title: String,
    /// Body text; may be empty.
    pub content: Option<String>,
}

/// Request body for `PUT /api/v1/books/{bookId}/pages/{pageId}`. Blank or
/// absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(default)]
pub struct UpdatePageRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

fn page_path(path: &(String, String)) -> Result<(BookId, PageId), Error> {
    Ok((parse_book_id(&path.0)?, parse_page_id(&path.1)?))
}

/// Pages of a book in reading order.
#[utoipa::path(
    get,
    path = "/api/v1/books/{bookId}/pages",
    params(("bookId" = String, Path, description = "Book identifier")),
    responses(
        (status = 200, description = "Pages retrieved", body = PageListEnvelopeSchema),
        (status = 400, description = "Malformed book id", body = ErrorSchema),
        (status = 404, description = "Book not found", body = ErrorSchema)
    ),
    tags = ["pages"],
    operation_id = "listPages",
    security([])
)]
#[get("/books/{book_id}/pages")]
pub async fn list_pages(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let book_id = parse_book_id(&path)?;
    let pages = state.books_query.list_pages(&book_id).await?;
    Ok(respond(StatusCode::OK, "Pages retrieved", pages))
}

/// Fetch one page of a book.
#[utoipa::path(
    get,
    path = "/api/v1/books/{bookId}/pages/{pageId}",
    params(
        ("bookId" = String, Path, description = "Book identifier"),
        ("pageId" = String, Path, description = "Page identifier")
    ),
    responses(
        (status = 200, description = "Page retrieved", body = PageEnvelopeSchema),
        (status = 400, description = "Malformed id", body = ErrorSchema),
        (status = 404, description = "Book or page not found", body = ErrorSchema)
    ),
    tags = ["pages"],
    operation_id = "getPage",
    security([])
)]
#[get("/books/{book_id}/pages/{page_id}")]
pub async fn get_page(
    state: web::Data<HttpState>,
    path: web::Path<(String, String)>,
) -> ApiResult<HttpResponse> {
    let (book_id, page_id) = page_path(&path)?;
    let page = state.books_query.get_page(&book_id, &page_id).await?;
    Ok(respond(StatusCode::OK, "Page retrieved", page))
}

/// Append a page to a book.
#[utoipa::path(
    post,
    path = "/api/v1/books/{bookId}/pages",
    params(("bookId" = String, Path, description = "Book identifier")),
    request_body = CreatePageRequest,
    responses(
        (status = 201, description = "Added page to book", body = PageEnvelopeSchema),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Not logged in or not the author", body = ErrorSchema),
        (status = 404, description = "Book not found", body = ErrorSchema),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["pages"],
    operation_id = "addPage"
)]
#[post("/books/{book_id}/pages")]
pub async fn add_page(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    path: web::Path<String>,
    payload: web::Json<CreatePageRequest>,
) -> ApiResult<HttpResponse> {
    let book_id = parse_book_id(&path)?;
    let draft = PageDraft::try_from_parts(&payload.title, payload.content.as_deref())
        .map_err(map_field_error)?;
    let page = state.books.add_page(user.user(), &book_id, draft).await?;
    info!(%book_id, page_id = %page.id, "page added");
    Ok(respond(StatusCode::CREATED, "Added page to book", page))
}

/// Update a page's title or content.
#[utoipa::path(
    put,
    path = "/api/v1/books/{bookId}/pages/{pageId}",
    params(
        ("bookId" = String, Path, description = "Book identifier"),
        ("pageId" = String, Path, description = "Page identifier")
    ),
    request_body = UpdatePageRequest,
    responses(
        (status = 200, description = "Updated page", body = PageEnvelopeSchema),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Not logged in or not the author", body = ErrorSchema),
        (status = 404, description = "Book or page not found", body = ErrorSchema)
    ),
    tags = ["pages"],
    operation_id = "updatePage"
)]
#[put("/books/{book_id}/pages/{page_id}")]
pub async fn update_page(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    path: web::Path<(String, String)>,
    payload: web::Json<UpdatePageRequest>,
) -> ApiResult<HttpResponse> {
    let (book_id, page_id) = page_path(&path)?;
    let patch = PagePatch::try_from_parts(payload.title.as_deref(), payload.content.as_deref())
        .map_err(map_field_error)?;
    let page = state
        .books
        .update_page(user.user(), &book_id, &page_id, patch)
        .await?;
    Ok(respond(StatusCode::OK, "Updated page", page))
}

/// Remove a page from its book and delete it.
#[utoipa::path(
    delete,
    path = "/api/v1/books/{bookId}/pages/{pageId}",
    params(
        ("bookId" = String, Path, description = "Book identifier"),
        ("pageId" = String, Path, description = "Page identifier")
    ),
    responses(
        (status = 200, description = "Removed page from book", body = EmptyEnvelopeSchema),
        (status = 401, description = "Not logged in or not the author", body = ErrorSchema),
        (status = 404, description = "Book or page not found", body = ErrorSchema),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["pages"],
    operation_id = "deletePage"
)]
#[delete("/books/{book_id}/pages/{page_id}")]
pub async fn delete_page(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    path: web::Path<(String, String)>,
) -> ApiResult<HttpResponse> {
    let (book_id, page_id) = page_path(&path)?;
    state
        .books
        .delete_page(user.user(), &book_id, &page_id)
        .await?;
    info!(%book_id, %page_id, "page removed");
    Ok(respond_empty(StatusCode::OK, "Removed page from book"))
}
