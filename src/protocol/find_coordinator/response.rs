//! Parsing and processing for Find Coordinator responses.
//!
//! ### Example
//! ```rust,ignore
//! let response_bytes = conn.request_sync(request, timeout).await?;
//! let find_coordinator_response =
//!     protocol::FindCoordinatorResponse::parse(response_bytes, version)?;
//! ```
//!
//! ### Protocol Def
//! ```text
//! FindCoordinator Response (Version: 0) => error_code node_id host port
//!   error_code => INT16
//!   node_id => INT32
//!   host => STRING
//!   port => INT32
//! FindCoordinator Response (Version: 1) => throttle_time_ms error_code error_message node_id host port
//!   throttle_time_ms => INT32
//!   error_code => INT16
//!   error_message => NULLABLE_STRING
//!   node_id => INT32
//!   host => STRING
//!   port => INT32
//! ```

use bytes::Bytes;
use nom::{number::complete::be_i32, IResult};
use nombytes::NomBytes;

use crate::{
    error::{Error, KafkaCode, Result},
    parser,
};

/// The base Find Coordinator response object.
///
/// `throttle_time_ms` and `error_message` only exist on the wire from
/// version 1 up; they come back as `None` for version 0 responses.
#[derive(Debug, PartialEq)]
pub struct FindCoordinatorResponse {
    pub throttle_time_ms: Option<i32>,
    pub error_code: KafkaCode,
    pub error_message: Option<Bytes>,
    pub node_id: i32,
    pub host: Bytes,
    pub port: i32,
}

impl FindCoordinatorResponse {
    pub fn parse(s: Bytes, version: i16) -> Result<Self> {
        tracing::trace!("Parsing FindCoordinatorResponse {:?}", s);
        let (_, find_coordinator) = parse_find_coordinator_response(version)(NomBytes::new(
            s.clone(),
        ))
        .map_err(|err| {
            tracing::error!("ERROR: Failed parsing FindCoordinatorResponse {:?}", err);
            tracing::error!("ERROR: FindCoordinatorResponse Bytes {:?}", s);
            Error::ParsingError(s)
        })?;
        tracing::trace!("Parsed FindCoordinatorResponse {:?}", find_coordinator);
        Ok(find_coordinator)
    }
}

pub fn parse_find_coordinator_response(
    version: i16,
) -> impl Fn(NomBytes) -> IResult<NomBytes, FindCoordinatorResponse> {
    move |s: NomBytes| {
        let (s, throttle_time_ms) = if version >= 1 {
            let (s, throttle) = be_i32(s)?;
            (s, Some(throttle))
        } else {
            (s, None)
        };
        let (s, error_code) = parser::parse_kafka_code(s)?;
        let (s, error_message) = if version >= 1 {
            parser::parse_nullable_string(s)?
        } else {
            (s, None)
        };
        let (s, node_id) = be_i32(s)?;
        let (s, host) = parser::parse_string(s)?;
        let (s, port) = be_i32(s)?;

        Ok((
            s,
            FindCoordinatorResponse {
                throttle_time_ms,
                error_code,
                error_message,
                node_id,
                host,
                port,
            },
        ))
    }
}
