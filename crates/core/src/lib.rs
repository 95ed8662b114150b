//! Core types and shared functionality for dimts-gw.
//!
//! This crate provides:
//! - Versioned bucket store with SQLite backend
//! - The asset manifest
//! - Unified error types
//! - Configuration structures

pub mod config;
pub mod error;
pub mod manifest;
pub mod store;

pub use config::AppConfig;
pub use error::Error;
pub use manifest::AssetManifest;
pub use store::{BucketStore, StoredResponse};
