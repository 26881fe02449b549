//! Outbound adapters implementing domain ports.
//!
//! - **persistence**: PostgreSQL JSONB document store (Diesel, bb8)
//! - **memory**: in-process document store and media host
//! - **media**: Cloudinary media host (reqwest)
//! - **security**: JWT credentials and Argon2 password hashing
//!
//! Adapters translate between domain types and their backing systems and
//! hold no business rules.

pub mod media;
pub mod memory;
pub mod persistence;
pub mod security;
