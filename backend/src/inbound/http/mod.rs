//! HTTP inbound adapter exposing the bookshelf REST endpoints.

pub mod auth;
pub mod books;
pub mod covers;
pub mod envelope;
pub mod error;
pub mod health;
pub mod pages;
pub mod routes;
pub mod schemas;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod token_config;
pub mod users;
pub mod validation;

pub use error::ApiResult;
