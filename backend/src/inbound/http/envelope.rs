//! Success response envelope shared by every JSON endpoint.
//!
//! Clients read `status`, `message` and `data` from one object regardless
//! of the route, so handlers build responses through [`respond`] rather than
//! serialising payloads directly.

use actix_web::{HttpResponse, HttpResponseBuilder, http::StatusCode};
use serde::Serialize;

/// Body of a successful response.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    /// Numeric HTTP status, repeated for clients that only see the body.
    pub status: u16,
    /// Human-readable outcome.
    pub message: &'static str,
    /// Payload; `null` when the operation returns nothing.
    pub data: Option<T>,
}

/// Build a response carrying `data` under `message`.
pub fn respond<T: Serialize>(status: StatusCode, message: &'static str, data: T) -> HttpResponse {
    respond_with(HttpResponse::Ok(), status, message, Some(data))
}

/// Build a response with a `null` payload.
pub fn respond_empty(status: StatusCode, message: &'static str) -> HttpResponse {
    respond_with(HttpResponse::Ok(), status, message, None::<()>)
}

/// Finish a pre-configured builder, for handlers that also set cookies.
pub fn respond_with<T: Serialize>(
    mut builder: HttpResponseBuilder,
    status: StatusCode,
    message: &'static str,
    data: Option<T>,
) -> HttpResponse {
    builder.status(status).json(Envelope {
        status: status.as_u16(),
        message,
        data,
    })
}
