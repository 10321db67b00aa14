//! Bytecode protocol requests & responses.
//!
//! This module implements the slice of the bytecode protocol outlined in
//! the [Kafka Documentation](https://kafka.apache.org/protocol.html) that
//! the connection and discovery layers drive themselves: metadata,
//! find coordinator, SASL handshake, and API versions.
//!
//! The module is set up as a list of message pairs containing two files
//! each corresponding to the request and response.
//!
//! The request files hold the logic for creating and encoding the bodies
//! that will be sent to the broker; the shared request header is stamped
//! on by the connection, which owns the correlation id space. The
//! response files hold the logic for parsing and processing the bodies
//! coming back from the broker, after the connection has peeled off the
//! correlation id.

pub mod api_versions;
pub mod find_coordinator;
pub mod metadata;
pub mod sasl_handshake;

use bytes::{BufMut, Bytes};
use nom::{number::complete::be_i32, IResult};
use nombytes::NomBytes;

// re exporting these for ease
pub use self::{
    api_versions::{request::ApiVersionsRequest, response::ApiVersionsResponse},
    find_coordinator::{
        request::{CoordinatorType, FindCoordinatorRequest},
        response::FindCoordinatorResponse,
    },
    metadata::{request::MetadataRequest, response::MetadataResponse},
    sasl_handshake::{request::SaslHandshakeRequest, response::SaslHandshakeResponse},
};
use crate::{
    encode::ToByte,
    error::{Error, Result},
};

/// Correlation id stamped on every handshake request so that
/// application correlation ids can start cleanly at 0.
pub const HANDSHAKE_CORRELATION_ID: i32 = i32::MAX;

/// The API keys this client knows by name.
///
/// The connection will happily carry any of these as a raw body; the
/// protocol module itself only knows the schema for the discovery and
/// handshake subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i16)]
pub enum ApiKey {
    Produce = 0,
    Fetch = 1,
    ListOffsets = 2,
    Metadata = 3,
    OffsetCommit = 8,
    OffsetFetch = 9,
    FindCoordinator = 10,
    JoinGroup = 11,
    Heartbeat = 12,
    LeaveGroup = 13,
    SyncGroup = 14,
    SaslHandshake = 17,
    ApiVersions = 18,
    CreateTopics = 19,
    DeleteTopics = 20,
    SaslAuthenticate = 36,
}

impl ApiKey {
    /// Every API key this client can put on the wire.
    pub fn all() -> &'static [ApiKey] {
        &[
            ApiKey::Produce,
            ApiKey::Fetch,
            ApiKey::ListOffsets,
            ApiKey::Metadata,
            ApiKey::OffsetCommit,
            ApiKey::OffsetFetch,
            ApiKey::FindCoordinator,
            ApiKey::JoinGroup,
            ApiKey::Heartbeat,
            ApiKey::LeaveGroup,
            ApiKey::SyncGroup,
            ApiKey::SaslHandshake,
            ApiKey::ApiVersions,
            ApiKey::CreateTopics,
            ApiKey::DeleteTopics,
            ApiKey::SaslAuthenticate,
        ]
    }

    /// The version range this crate carries schema knowledge for, or
    /// `None` for APIs whose bodies callers encode themselves.
    pub fn supported_version_range(self) -> Option<(i16, i16)> {
        match self {
            ApiKey::Metadata => Some((0, 0)),
            ApiKey::FindCoordinator => Some((0, 1)),
            ApiKey::SaslHandshake => Some((0, 0)),
            ApiKey::ApiVersions => Some((0, 0)),
            _ => None,
        }
    }

    /// The version a 0.9 era broker speaks for this API, for peers that
    /// predate the ApiVersions request. APIs that did not exist back
    /// then have no entry.
    pub fn kafka_09_range(self) -> Option<(i16, i16)> {
        match self {
            ApiKey::Metadata => Some((0, 0)),
            ApiKey::FindCoordinator => Some((0, 0)),
            _ => None,
        }
    }
}

/// A request ready for the multiplexer: which API and version the body
/// speaks, whether a response is expected, and the pre-encoded body.
#[derive(Debug, Clone)]
pub struct KafkaRequest {
    /// The API key of this request.
    pub api: ApiKey,
    /// The API version the body was encoded at.
    pub version: i16,
    /// When set, no response will ever arrive for this request; the
    /// correlation id is consumed on the wire but no waiter is kept.
    pub no_ack: bool,
    /// The request body, without the shared header.
    pub body: Bytes,
}

impl KafkaRequest {
    pub fn new(api: ApiKey, version: i16, body: Bytes) -> Self {
        Self {
            api,
            version,
            no_ack: false,
            body,
        }
    }

    /// A fire-and-forget request (e.g. produce with acks=0).
    pub fn no_ack(api: ApiKey, version: i16, body: Bytes) -> Self {
        Self {
            api,
            version,
            no_ack: true,
            body,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HeaderRequest<'a> {
    /// The API key of this request.
    pub api_key: ApiKey,
    /// The API version of this request.
    pub api_version: i16,
    /// The correlation ID of this request.
    pub correlation_id: i32,
    /// The client ID string.
    pub client_id: &'a str,
}

impl<'a> HeaderRequest<'a> {
    /// Create new header request.
    ///
    /// This goes at the beginning of every single request.
    pub fn new(
        api_key: ApiKey,
        api_version: i16,
        correlation_id: i32,
        client_id: &'a str,
    ) -> HeaderRequest {
        HeaderRequest {
            api_key,
            api_version,
            correlation_id,
            client_id,
        }
    }
}

impl<'a> ToByte for HeaderRequest<'a> {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        (self.api_key as i16).encode(buffer)?;
        self.api_version.encode(buffer)?;
        self.correlation_id.encode(buffer)?;
        self.client_id.encode(buffer)?;
        Ok(())
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct HeaderResponse {
    /// The correlation ID of this response.
    pub correlation_id: i32,
}

pub fn parse_header_response(s: NomBytes) -> IResult<NomBytes, HeaderResponse> {
    let (s, correlation_id) = be_i32(s)?;
    Ok((s, HeaderResponse { correlation_id }))
}

/// Split a framed response payload into its correlation id and body.
pub fn split_correlation_id(frame: Bytes) -> Result<(i32, Bytes)> {
    let (rest, header) = parse_header_response(NomBytes::new(frame.clone()))
        .map_err(|_| Error::ParsingError(frame))?;
    Ok((header.correlation_id, rest.to_bytes()))
}
