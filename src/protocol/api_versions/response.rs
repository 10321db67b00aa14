//! Parsing and processing for API Versions responses.
//!
//! ### Protocol Def
//! ```text
//! ApiVersions Response (Version: 0) => error_code [api_keys]
//!   error_code => INT16
//!   api_keys => api_key min_version max_version
//!     api_key => INT16
//!     min_version => INT16
//!     max_version => INT16
//! ```

use bytes::Bytes;
use nom::{number::complete::be_i16, IResult};
use nombytes::NomBytes;

use crate::{
    error::{Error, KafkaCode, Result},
    parser,
};

/// The base API Versions response object.
#[derive(Debug, PartialEq)]
pub struct ApiVersionsResponse {
    /// The error code, or 0 if there was no error.
    pub error_code: KafkaCode,
    /// The version range the broker advertises per API.
    pub api_keys: Vec<ApiVersion>,
}

/// One advertised API range.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiVersion {
    pub api_key: i16,
    pub min_version: i16,
    pub max_version: i16,
}

impl TryFrom<Bytes> for ApiVersionsResponse {
    type Error = Error;

    fn try_from(s: Bytes) -> Result<Self> {
        tracing::trace!("Parsing ApiVersionsResponse {:?}", s);
        let (_, versions) =
            parse_api_versions_response(NomBytes::new(s.clone())).map_err(|err| {
                tracing::error!("ERROR: Failed parsing ApiVersionsResponse {:?}", err);
                tracing::error!("ERROR: ApiVersionsResponse Bytes {:?}", s);
                Error::ParsingError(s)
            })?;
        tracing::trace!("Parsed ApiVersionsResponse {:?}", versions);
        Ok(versions)
    }
}

pub fn parse_api_versions_response(s: NomBytes) -> IResult<NomBytes, ApiVersionsResponse> {
    let (s, error_code) = parser::parse_kafka_code(s)?;
    let (s, api_keys) = parser::parse_array(parse_api_version)(s)?;

    Ok((
        s,
        ApiVersionsResponse {
            error_code,
            api_keys,
        },
    ))
}

fn parse_api_version(s: NomBytes) -> IResult<NomBytes, ApiVersion> {
    let (s, api_key) = be_i16(s)?;
    let (s, min_version) = be_i16(s)?;
    let (s, max_version) = be_i16(s)?;

    Ok((
        s,
        ApiVersion {
            api_key,
            min_version,
            max_version,
        },
    ))
}
