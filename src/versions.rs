//! Per-connection API version negotiation.
//!
//! Brokers advertise a `(min, max)` version range per API; the usable
//! range on a connection is the per-API intersection of what the broker
//! advertises and what this client carries schema for. Brokers too old
//! to answer the ApiVersions request at all get pinned to the 0.9 era
//! table instead.

use std::collections::HashMap;

use crate::connection::Connection;
use crate::error::{Error, KafkaCode, Result};
use crate::protocol::api_versions::response::ApiVersion;
use crate::protocol::{ApiKey, ApiVersionsRequest, ApiVersionsResponse};

/// Negotiated `(min, max)` per API.
pub type VersionRanges = HashMap<ApiKey, (i16, i16)>;

pub(crate) async fn negotiate(conn: &Connection) -> Result<VersionRanges> {
    let request = ApiVersionsRequest::new().into_request()?;
    let body = conn
        .request_sync(request, conn.request_timeout())
        .await?
        .ok_or_else(|| Error::ProtocolError("api_versions expects a response".into()))?;

    match ApiVersionsResponse::try_from(body) {
        Ok(response) if response.error_code == KafkaCode::None => {
            let ranges = intersect(&response.api_keys);
            tracing::debug!("Negotiated API versions with {}: {:?}", conn.addr(), ranges);
            Ok(ranges)
        }
        Ok(response) => {
            tracing::debug!(
                "Broker {} rejected api_versions ({:?}); assuming a 0.9 era peer",
                conn.addr(),
                response.error_code
            );
            Ok(kafka_09_fallback())
        }
        Err(_) => {
            tracing::debug!(
                "Unparseable api_versions response from {}; assuming a 0.9 era peer",
                conn.addr()
            );
            Ok(kafka_09_fallback())
        }
    }
}

/// Intersect the broker's advertised ranges with the local tables,
/// keeping only APIs both sides can actually speak.
pub(crate) fn intersect(advertised: &[ApiVersion]) -> VersionRanges {
    let mut ranges = VersionRanges::new();
    for api in ApiKey::all() {
        let Some(local) = api.supported_version_range() else {
            continue;
        };
        let Some(remote) = advertised.iter().find(|v| v.api_key == *api as i16) else {
            continue;
        };
        if let Some(range) = intersect_range(local, (remote.min_version, remote.max_version)) {
            ranges.insert(*api, range);
        }
    }
    ranges
}

pub(crate) fn intersect_range(client: (i16, i16), server: (i16, i16)) -> Option<(i16, i16)> {
    let min = client.0.max(server.0);
    let max = client.1.min(server.1);
    (min <= max).then_some((min, max))
}

/// What a pre-ApiVersions broker speaks: the 0.9 minimum of every
/// locally known API, as a degenerate `(min, min)` range.
pub(crate) fn kafka_09_fallback() -> VersionRanges {
    ApiKey::all()
        .iter()
        .filter_map(|api| api.kafka_09_range().map(|(min, _)| (*api, (min, min))))
        .collect()
}
