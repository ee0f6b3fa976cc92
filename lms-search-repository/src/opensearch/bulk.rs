//! Bulk request body encoding.
//!
//! The bulk endpoint takes newline-delimited JSON: an action line followed by
//! its document line, for every operation, with a trailing newline. The body
//! is gzip compressed before it is sent.

use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::errors::SearchError;
use lms_search_shared::BulkOperation;

/// Content type of the uncompressed bulk body.
pub const BULK_CONTENT_TYPE: &str = "application/x-ndjson";

/// Content encoding header value sent with every bulk request.
pub const BULK_CONTENT_ENCODING: &str = "gzip";

/// Serialize operations to ND-JSON, action line first.
pub fn to_ndjson(operations: &[BulkOperation]) -> Result<String, SearchError> {
    let mut body = String::new();
    for operation in operations {
        for line in operation.lines() {
            let encoded = serde_json::to_string(&line)
                .map_err(|e| SearchError::serialization(e.to_string()))?;
            body.push_str(&encoded);
            body.push('\n');
        }
    }
    Ok(body)
}

/// Serialize and gzip operations into a bulk request body.
pub fn encode_bulk_body(operations: &[BulkOperation]) -> Result<Vec<u8>, SearchError> {
    let ndjson = to_ndjson(operations)?;
    let mut encoder = GzEncoder::new(Vec::with_capacity(ndjson.len() / 4), Compression::default());
    encoder
        .write_all(ndjson.as_bytes())
        .map_err(|e| SearchError::serialization(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| SearchError::serialization(e.to_string()))
}
