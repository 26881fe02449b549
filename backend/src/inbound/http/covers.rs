//! Cover upload handlers.
//!
//! ```text
//! PUT /api/v1/books/{bookId}/cover                  multipart field `cover`
//! PUT /api/v1/books/{bookId}/pages/{pageId}/cover   multipart field `cover`
//! ```
//!
//! The upload is buffered in memory, bounded by [`MAX_COVER_BYTES`], and
//! handed to the book service which runs the upload, persist, delete-old
//! sequence. Deletion of the previous asset continues after the response.

use actix_multipart::{Field, Multipart};
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, put, web};
use futures_util::StreamExt;
use tracing::{debug, info};

use crate::domain::{CoverChange, CoverTarget, Error};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::AuthenticatedUser;
use crate::inbound::http::envelope::respond;
use crate::inbound::http::schemas::{CoverEnvelopeSchema, ErrorSchema};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    COVER, empty_upload_error, missing_field_error, parse_book_id, parse_page_id,
    upload_too_large_error,
};

/// Largest accepted cover upload.
pub const MAX_COVER_BYTES: usize = 10 * 1024 * 1024;

fn malformed_upload(err: actix_multipart::MultipartError) -> Error {
    debug!(error = %err, "rejecting malformed multipart body");
    Error::invalid_request("malformed multipart body")
}

async fn read_field(mut field: Field) -> Result<Vec<u8>, Error> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(malformed_upload)?;
        if bytes.len() + chunk.len() > MAX_COVER_BYTES {
            return Err(upload_too_large_error(MAX_COVER_BYTES));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

/// Bytes of the `cover` part. Other parts are drained and ignored.
async fn read_cover(mut payload: Multipart) -> Result<Vec<u8>, Error> {
    while let Some(field) = payload.next().await {
        let field = field.map_err(malformed_upload)?;
        if field.name() != Some("cover") {
            continue;
        }
        let bytes = read_field(field).await?;
        if bytes.is_empty() {
            return Err(empty_upload_error());
        }
        return Ok(bytes);
    }
    Err(missing_field_error(COVER))
}

fn cover_response(change: CoverChange, message: &'static str) -> HttpResponse {
    let CoverChange { asset, retired } = change;
    if let Some(retired) = retired {
        debug!(asset = %retired.asset(), "previous cover deletion running in background");
    }
    respond(StatusCode::OK, message, asset)
}

/// Replace the cover of a book.
#[utoipa::path(
    put,
    path = "/api/v1/books/{bookId}/cover",
    params(("bookId" = String, Path, description = "Book identifier")),
    request_body(content_type = "multipart/form-data", description = "Image in the `cover` field"),
    responses(
        (status = 200, description = "Changed book cover", body = CoverEnvelopeSchema),
        (status = 400, description = "Missing, empty or oversized upload", body = ErrorSchema),
        (status = 401, description = "Not logged in or not the author", body = ErrorSchema),
        (status = 404, description = "Book not found", body = ErrorSchema),
        (status = 500, description = "Upload or persistence failed", body = ErrorSchema)
    ),
    tags = ["covers"],
    operation_id = "changeBookCover"
)]
#[put("/books/{book_id}/cover")]
pub async fn change_book_cover(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    path: web::Path<String>,
    payload: Multipart,
) -> ApiResult<HttpResponse> {
    let book_id = parse_book_id(&path)?;
    let upload = read_cover(payload).await?;
    let change = state
        .books
        .change_cover(user.user(), CoverTarget::Book(book_id), upload)
        .await?;
    info!(%book_id, asset = %change.asset, "book cover changed");
    Ok(cover_response(change, "Changed book cover"))
}

/// Replace the cover of a page.
#[utoipa::path(
    put,
    path = "/api/v1/books/{bookId}/pages/{pageId}/cover",
    params(
        ("bookId" = String, Path, description = "Book identifier"),
        ("pageId" = String, Path, description = "Page identifier")
    ),
    request_body(content_type = "multipart/form-data", description = "Image in the `cover` field"),
    responses(
        (status = 200, description = "Changed page cover", body = CoverEnvelopeSchema),
        (status = 400, description = "Missing, empty or oversized upload", body = ErrorSchema),
        (status = 401, description = "Not logged in or not the author", body = ErrorSchema),
        (status = 404, description = "Book or page not found", body = ErrorSchema),
        (status = 500, description = "Upload or persistence failed", body = ErrorSchema)
    ),
    tags = ["covers"],
    operation_id = "changePageCover"
)]
#[put("/books/{book_id}/pages/{page_id}/cover")]
pub async fn change_page_cover(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    path: web::Path<(String, String)>,
    payload: Multipart,
) -> ApiResult<HttpResponse> {
    let book = parse_book_id(&path.0)?;
    let page = parse_page_id(&path.1)?;
    let upload = read_cover(payload).await?;
    let change = state
        .books
        .change_cover(user.user(), CoverTarget::Page { book, page }, upload)
        .await?;
    info!(book_id = %book, page_id = %page, asset = %change.asset, "page cover changed");
    Ok(cover_response(change, "Changed page cover"))
}
