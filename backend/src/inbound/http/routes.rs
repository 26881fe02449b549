//! Route table for the `/api/v1` scope.
//!
//! Shared by the server binary and the integration tests so both exercise
//! the same handler set and body limits.

use actix_web::error::JsonPayloadError;
use actix_web::{HttpRequest, web};
use tracing::debug;

use crate::domain::Error;

use super::{books, covers, pages, users};

/// Largest accepted JSON body. Page content dominates at 100 000 characters.
pub const JSON_LIMIT_BYTES: usize = 512 * 1024;

fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    debug!(error = %err, "rejecting JSON body");
    let message = match &err {
        JsonPayloadError::OverflowKnownLength { .. } | JsonPayloadError::Overflow { .. } => {
            "request body is too large"
        }
        JsonPayloadError::ContentType => "expected an application/json body",
        _ => "malformed JSON body",
    };
    Error::invalid_request(message).into()
}

/// JSON extractor settings reporting failures in the error envelope.
#[must_use]
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_LIMIT_BYTES)
        .error_handler(json_error)
}

/// Register every `/api/v1` handler on `cfg`.
///
/// # Examples
/// ```
/// use actix_web::{App, web};
/// use bookshelf::inbound::http::routes::configure_api;
///
/// let _app = App::new().service(web::scope("/api/v1").configure(configure_api));
/// ```
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .service(users::create_account)
        .service(users::login)
        .service(users::logout)
        .service(users::current_user)
        .service(users::update_user)
        .service(books::list_books)
        .service(books::create_book)
        .service(covers::change_book_cover)
        .service(covers::change_page_cover)
        .service(pages::list_pages)
        .service(pages::add_page)
        .service(pages::get_page)
        .service(pages::update_page)
        .service(pages::delete_page)
        .service(books::get_book)
        .service(books::update_book)
        .service(books::delete_book);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::MockBookCommand;
    use crate::inbound::http::test_utils::{TestPorts, json_body};
    use actix_web::http::{StatusCode, header};
    use actix_web::{App, test};
    use rstest::rstest;

    #[rstest]
    #[case::malformed("{not json", "application/json", "malformed JSON body")]
    #[case::wrong_type("title=x", "text/plain", "expected an application/json body")]
    #[actix_web::test]
    async fn json_failures_use_the_error_envelope(
        #[case] body: &'static str,
        #[case] content_type: &'static str,
        #[case] message: &str,
    ) {
        let mut books = MockBookCommand::new();
        books.expect_create_book().never();
        let state = TestPorts::default().signed_in().with_books(books).into_state();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .service(web::scope("/api/v1").configure(configure_api)),
        )
        .await;

        let request = test::TestRequest::post()
            .uri("/api/v1/books")
            .insert_header((header::AUTHORIZATION, "Bearer valid"))
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(body)
            .to_request();
        let response = test::call_service(&app, request).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let payload = json_body(response).await;
        assert_eq!(payload["code"], "invalid_request");
        assert_eq!(payload["message"], message);
        assert_eq!(payload["status"], 400);
    }
}
