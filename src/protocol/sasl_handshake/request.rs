//! Encoding and creation for SASL Handshake requests.
//!
//! The handshake announces the mechanism the client intends to
//! authenticate with. At version 0 the token exchange that follows runs
//! as raw length-prefixed frames outside the Kafka request envelope.
//!
//! ### Protocol Def
//! ```text
//! SaslHandshake Request (Version: 0) => mechanism
//!   mechanism => STRING
//! ```

use bytes::{BufMut, Bytes};

use crate::{
    encode::ToByte,
    error::Result,
    protocol::{ApiKey, KafkaRequest},
};

const API_VERSION: i16 = 0;

/// The base SASL Handshake request object.
#[derive(Debug)]
pub struct SaslHandshakeRequest<'a> {
    /// The SASL mechanism chosen by the client.
    pub mechanism: &'a str,
}

impl<'a> SaslHandshakeRequest<'a> {
    pub fn new(mechanism: &'a str) -> Self {
        Self { mechanism }
    }

    /// Encode the body and wrap it for the handshake sender.
    pub fn into_request(self) -> Result<KafkaRequest> {
        let mut body = vec![];
        self.encode(&mut body)?;
        Ok(KafkaRequest::new(
            ApiKey::SaslHandshake,
            API_VERSION,
            Bytes::from(body),
        ))
    }
}

impl<'a> ToByte for SaslHandshakeRequest<'a> {
    fn encode<T: BufMut>(&self, buffer: &mut T) -> Result<()> {
        tracing::trace!("Encoding SaslHandshakeRequest {:?}", self);
        self.mechanism.encode(buffer)?;
        Ok(())
    }
}
