//! Network capability for dimts-gw.
//!
//! This crate provides the upstream fetch pipeline: the `Fetch` trait the
//! gateway is generic over, a reqwest-backed client, and URL helpers.

pub mod fetch;

pub use fetch::{Fetch, FetchClient, FetchConfig, FetchResponse, OutboundRequest};
pub use fetch::url::{canonicalize, same_origin};
