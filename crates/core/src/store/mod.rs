//! SQLite-backed bucket store for cached responses.
//!
//! This module provides the durable offline cache using SQLite with async
//! access via tokio-rusqlite. It supports:
//!
//! - Named, versioned buckets with all-or-nothing eviction
//! - Response entries keyed by SHA-256 of request identity
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod buckets;
pub mod connection;
pub mod entries;
pub mod key;
pub mod migrations;

pub use crate::Error;

pub use connection::BucketStore;
pub use entries::StoredResponse;
