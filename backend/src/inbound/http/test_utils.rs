//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use actix_web::body::to_bytes;
use actix_web::dev::ServiceResponse;
use serde_json::Value;

use crate::domain::ports::{
    MockAccountCommand, MockAuthenticator, MockBookCommand, MockBookQuery,
};
use crate::domain::{
    Book, BookDraft, BookId, CoverAssetId, EmailAddress, Page, PageDraft, PageId, User, UserId,
    UserName,
};
use crate::test_support::fixture_timestamp;

use super::state::{CookieSettings, HttpState, HttpStatePorts};

pub const FIXTURE_USER_ID: &str = "3fa85f64-5717-4562-b3fc-2c963f66afa6";
pub const FIXTURE_BOOK_ID: &str = "6c0a1f7e-2b3d-4e5f-8a9b-0c1d2e3f4a5b";
pub const FIXTURE_PAGE_ID: &str = "9d8c7b6a-5f4e-4d3c-b2a1-0f9e8d7c6b5a";

/// User returned by authenticators in handler tests.
pub fn fixture_user() -> User {
    User::new(
        UserId::new(FIXTURE_USER_ID).expect("fixture id"),
        UserName::new("Ada Lovelace").expect("fixture name"),
        EmailAddress::new("ada@example.com").expect("fixture email"),
        fixture_timestamp(),
        fixture_timestamp(),
    )
}

/// Book authored by [`fixture_user`] holding [`fixture_page`].
pub fn fixture_book() -> Book {
    let draft = BookDraft::try_from_parts("The Analytical Engine", "Notes on the engine", None)
        .expect("fixture draft");
    let mut book = Book::create(draft, *fixture_user().id(), fixture_timestamp());
    book.id = BookId::new(FIXTURE_BOOK_ID).expect("fixture book id");
    book.pages = vec![PageId::new(FIXTURE_PAGE_ID).expect("fixture page id")];
    book.cover = CoverAssetId::new("bookshelf/cover-1");
    book
}

/// First page of [`fixture_book`].
pub fn fixture_page() -> Page {
    let draft = PageDraft::try_from_parts("Note A", Some("The engine weaves patterns."))
        .expect("fixture page draft");
    let mut page = Page::create(draft, fixture_timestamp());
    page.id = PageId::new(FIXTURE_PAGE_ID).expect("fixture page id");
    page
}

/// Mock ports for handler tests. Unset ports reject every call.
#[derive(Default)]
pub struct TestPorts {
    accounts: Option<MockAccountCommand>,
    authenticator: Option<MockAuthenticator>,
    books: Option<MockBookCommand>,
    books_query: Option<MockBookQuery>,
}

impl TestPorts {
    pub fn with_accounts(mut self, accounts: MockAccountCommand) -> Self {
        self.accounts = Some(accounts);
        self
    }

    pub fn with_authenticator(mut self, authenticator: MockAuthenticator) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    /// Authenticator that resolves every token to [`fixture_user`].
    pub fn signed_in(self) -> Self {
        let mut authenticator = MockAuthenticator::new();
        authenticator
            .expect_authenticate()
            .returning(|_| Ok(fixture_user()));
        self.with_authenticator(authenticator)
    }

    pub fn with_books(mut self, books: MockBookCommand) -> Self {
        self.books = Some(books);
        self
    }

    pub fn with_books_query(mut self, books_query: MockBookQuery) -> Self {
        self.books_query = Some(books_query);
        self
    }

    pub fn into_state(self) -> HttpState {
        HttpState::new(
            HttpStatePorts {
                accounts: Arc::new(self.accounts.unwrap_or_default()),
                authenticator: Arc::new(self.authenticator.unwrap_or_default()),
                books: Arc::new(self.books.unwrap_or_default()),
                books_query: Arc::new(self.books_query.unwrap_or_default()),
            },
            CookieSettings { secure: false },
        )
    }
}

/// Decode a JSON response body.
pub async fn json_body(response: ServiceResponse) -> Value {
    let bytes = to_bytes(response.into_body())
        .await
        .expect("reading response body succeeds");
    serde_json::from_slice(&bytes).expect("response body is JSON")
}
