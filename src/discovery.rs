//! Resolve partition leaders and coordinators through a live connection.
//!
//! Both pipelines ride an already-established connection: look up the
//! negotiated version for the API, issue the request, and dig the
//! endpoint out of the response. The caller decides what to do with the
//! endpoint; typically it opens a fresh connection there (see the
//! bootstrap module).

use std::time::Duration;

use bytes::Bytes;

use crate::connection::Connection;
use crate::error::{Error, KafkaCode, Result};
use crate::network::BrokerAddress;
use crate::protocol::{
    ApiKey, CoordinatorType, FindCoordinatorRequest, FindCoordinatorResponse, KafkaRequest,
    MetadataRequest, MetadataResponse,
};

/// Find the broker currently leading `topic`/`partition`.
pub async fn discover_partition_leader(
    conn: &Connection,
    topic: &str,
    partition: i32,
    deadline: Duration,
) -> Result<BrokerAddress> {
    // metadata is pinned at v0 here; the lookup still gates on the
    // broker speaking it at all
    conn.api_version_range(ApiKey::Metadata).await?;
    tracing::debug!(
        "Looking up leader for {}-{} via {}",
        topic,
        partition,
        conn.addr()
    );

    let request = MetadataRequest::new(&[topic]).into_request()?;
    let body = sync_response(conn, request, deadline).await?;
    let response = MetadataResponse::try_from(body)?;

    let topic_entry = {
        let mut matches = response
            .topics
            .iter()
            .filter(|t| t.name.as_ref() == topic.as_bytes());
        match (matches.next(), matches.next()) {
            (None, _) => return Err(Error::KafkaError(KafkaCode::UnknownTopicOrPartition)),
            (Some(entry), None) => entry,
            (Some(_), Some(_)) => {
                return Err(Error::ProtocolError(format!(
                    "more than one metadata entry for topic {topic}"
                )))
            }
        }
    };
    if topic_entry.error_code != KafkaCode::None {
        return Err(Error::KafkaError(topic_entry.error_code));
    }

    let partition_entry = {
        let mut matches = topic_entry
            .partitions
            .iter()
            .filter(|p| p.partition_index == partition);
        match (matches.next(), matches.next()) {
            (None, _) => return Err(Error::KafkaError(KafkaCode::UnknownTopicOrPartition)),
            (Some(entry), None) => entry,
            (Some(_), Some(_)) => {
                return Err(Error::ProtocolError(format!(
                    "more than one metadata entry for partition {topic}-{partition}"
                )))
            }
        }
    };
    if partition_entry.error_code != KafkaCode::None {
        return Err(Error::KafkaError(partition_entry.error_code));
    }

    let leader_id = partition_entry.leader_id;
    let broker = {
        let mut matches = response.brokers.iter().filter(|b| b.node_id == leader_id);
        match (matches.next(), matches.next()) {
            (Some(broker), None) => broker,
            (None, _) => {
                return Err(Error::ProtocolError(format!(
                    "leader {leader_id} for {topic}-{partition} missing from broker list"
                )))
            }
            (Some(_), Some(_)) => {
                return Err(Error::ProtocolError(format!(
                    "broker id {leader_id} appears more than once"
                )))
            }
        }
    };

    let addr = broker_address(&broker.host, broker.port)?;
    tracing::debug!("Leader for {}-{} is {}", topic, partition, addr);
    Ok(addr)
}

/// Find the group or transaction coordinator for `id`.
pub async fn discover_coordinator(
    conn: &Connection,
    coordinator_type: CoordinatorType,
    id: &str,
    deadline: Duration,
) -> Result<BrokerAddress> {
    let (_, version) = conn.api_version_range(ApiKey::FindCoordinator).await?;
    tracing::debug!(
        "Looking up {:?} coordinator for {:?} via {} (v{})",
        coordinator_type,
        id,
        conn.addr(),
        version
    );

    // rejects transaction lookups at v0 before anything hits the wire
    let request = FindCoordinatorRequest::new(id, coordinator_type, version)?.into_request()?;
    let body = sync_response(conn, request, deadline).await?;
    let response = FindCoordinatorResponse::parse(body, version)?;

    match response.error_code {
        KafkaCode::None => {
            let addr = broker_address(&response.host, response.port)?;
            tracing::debug!("Coordinator for {:?} is {}", id, addr);
            Ok(addr)
        }
        code => match response.error_message {
            Some(message) => Err(Error::KafkaErrorMessage {
                code,
                message: String::from_utf8_lossy(&message).into_owned(),
            }),
            None => Err(Error::KafkaError(code)),
        },
    }
}

async fn sync_response(
    conn: &Connection,
    request: KafkaRequest,
    deadline: Duration,
) -> Result<Bytes> {
    conn.request_sync(request, deadline)
        .await?
        .ok_or_else(|| Error::ProtocolError("discovery requests expect a response".into()))
}

fn broker_address(host: &Bytes, port: i32) -> Result<BrokerAddress> {
    let host = std::str::from_utf8(host)
        .map_err(|_| Error::DecodingUtf8Error)?
        .to_owned();
    let port =
        u16::try_from(port).map_err(|_| Error::ProtocolError(format!("port {port} out of range")))?;
    Ok(BrokerAddress { host, port })
}
