//! Encoding and creation for Metadata requests.
//!
//! ### Example
//! ```rust,ignore
//! let metadata_request = protocol::MetadataRequest::new(&topic_names);
//! conn.request_sync(metadata_request.into_request()?, timeout).await?;
//! ```
//!
//! ### Protocol Def
//! ```text
//! Metadata Request (Version: 0) => [topics]
//!   topics => name
//!   name => STRING
//! ```
//!
//! Note we are using version 0 of the request.

use bytes::{BufMut, Bytes};

use crate::{
    encode::ToByte,
    error::Result,
    protocol::{ApiKey, KafkaRequest},
};

const API_VERSION: i16 = 0;

/// The base Metadata request object.
///
/// ### Example
/// ```rust,ignore
/// let metadata_request = protocol::MetadataRequest::new(&topic_names);
/// conn.request_sync(metadata_request.into_request()?, timeout).await?;
/// ```
#[derive(Debug)]
pub struct MetadataRequest<'a, T> {
    /// The topics to fetch metadata for.
    pub topics: &'a [T],
}

impl<'a, T: AsRef<str>> MetadataRequest<'a, T> {
    pub fn new(topics: &'a [T]) -> MetadataRequest<'a, T> {
        MetadataRequest { topics }
    }

    /// Encode the body and wrap it for the multiplexer.
    pub fn into_request(self) -> Result<KafkaRequest> {
        let mut body = vec![];
        self.encode(&mut body)?;
        Ok(KafkaRequest::new(
            ApiKey::Metadata,
            API_VERSION,
            Bytes::from(body),
        ))
    }
}

impl<'a, T: AsRef<str> + 'a> ToByte for MetadataRequest<'a, T> {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        tracing::trace!("Encoding MetadataRequest with {} topics", self.topics.len());
        let l = self.topics.len() as i32;
        l.encode(buffer)?;
        for topic in self.topics {
            topic.as_ref().encode(buffer)?;
        }
        Ok(())
    }
}
