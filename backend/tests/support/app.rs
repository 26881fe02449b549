//! Full HTTP stack over in-memory adapters for integration tests.

use std::sync::Arc;

use actix_web::body::{BoxBody, to_bytes};
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::http::{StatusCode, header};
use actix_web::{App, web};
use mockable::DefaultClock;
use serde_json::Value;

use bookshelf::Trace;
use bookshelf::domain::{
    AccountService, AuthGateService, BookAggregateService, MediaAttachmentManager,
};
use bookshelf::inbound::http::health::{HealthState, live, ready};
use bookshelf::inbound::http::routes::configure_api;
use bookshelf::inbound::http::state::{CookieSettings, HttpState, HttpStatePorts};
use bookshelf::outbound::memory::{InMemoryDocumentStore, InMemoryMediaHost};
use bookshelf::outbound::security::{Argon2PasswordHasher, JwtCredentialService};

/// Adapters shared between the app and assertions.
pub struct Backends {
    pub store: Arc<InMemoryDocumentStore>,
    pub media: Arc<InMemoryMediaHost>,
}

impl Backends {
    pub fn new() -> Self {
        Self {
            store: Arc::new(InMemoryDocumentStore::new()),
            media: Arc::new(InMemoryMediaHost::new("bookshelf")),
        }
    }

    fn http_state(&self) -> HttpState {
        let clock = Arc::new(DefaultClock);
        let credentials = Arc::new(JwtCredentialService::new(vec![42_u8; 32]));
        let books = Arc::new(BookAggregateService::new(
            self.store.clone(),
            MediaAttachmentManager::new(self.media.clone()),
            clock.clone(),
        ));
        HttpState::new(
            HttpStatePorts {
                accounts: Arc::new(AccountService::new(
                    self.store.clone(),
                    Arc::new(Argon2PasswordHasher::default()),
                    credentials.clone(),
                    clock.clone(),
                )),
                authenticator: Arc::new(AuthGateService::new(
                    self.store.clone(),
                    credentials,
                    clock,
                )),
                books: books.clone(),
                books_query: books,
            },
            CookieSettings { secure: false },
        )
    }
}

/// App wired the way the server binary wires it.
pub fn app(
    backends: &Backends,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    > + use<>,
> {
    let health = HealthState::new(backends.store.clone());
    health.mark_ready();
    App::new()
        .app_data(web::Data::new(health))
        .app_data(web::Data::new(backends.http_state()))
        .wrap(Trace)
        .service(web::scope("/api/v1").configure(configure_api))
        .service(ready)
        .service(live)
}

/// Status, trace header and JSON body of a response.
pub struct Reply {
    pub status: StatusCode,
    pub trace_id: Option<String>,
    pub token_cookie: Option<String>,
    pub body: Value,
}

pub async fn reply(response: ServiceResponse<BoxBody>) -> Reply {
    let status = response.status();
    let trace_id = response
        .headers()
        .get("trace-id")
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let token_cookie = response
        .response()
        .cookies()
        .find(|cookie| cookie.name() == "token")
        .map(|cookie| cookie.value().to_owned());
    let bytes = to_bytes(response.into_body())
        .await
        .unwrap_or_default();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("JSON body")
    };
    Reply {
        status,
        trace_id,
        token_cookie,
        body,
    }
}

/// `Authorization` header carrying `token`.
pub fn bearer(token: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {token}"))
}
