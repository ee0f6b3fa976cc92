//! OpenSearch implementation of the search engine client.
//!
//! This module provides a concrete implementation of `SearchEngineClient`
//! using OpenSearch as the backend, together with the bulk body codec and
//! the generic query builders shared by every index.

mod bulk;
mod client;
pub mod queries;

pub use bulk::{encode_bulk_body, to_ndjson, BULK_CONTENT_ENCODING, BULK_CONTENT_TYPE};
pub use client::OpenSearchClient;
