//! Encoding and creation for API Versions requests.
//!
//! ### Protocol Def
//! ```text
//! ApiVersions Request (Version: 0) =>
//! ```
//!
//! Version 0 carries no body at all; everything interesting lives in
//! the response.

use bytes::Bytes;

use crate::{
    error::Result,
    protocol::{ApiKey, KafkaRequest},
};

const API_VERSION: i16 = 0;

/// The base API Versions request object.
#[derive(Debug, Default)]
pub struct ApiVersionsRequest {}

impl ApiVersionsRequest {
    pub fn new() -> Self {
        Self {}
    }

    /// Wrap the (empty) body for the multiplexer.
    pub fn into_request(self) -> Result<KafkaRequest> {
        Ok(KafkaRequest::new(
            ApiKey::ApiVersions,
            API_VERSION,
            Bytes::new(),
        ))
    }
}
