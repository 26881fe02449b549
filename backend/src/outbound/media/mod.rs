//! Remote media host adapters.

mod cloudinary;
mod dto;

pub use cloudinary::{CloudinaryConfig, CloudinaryMediaHost, DEFAULT_API_BASE};
