//! Get from a bootstrap list to the connection you actually want.
//!
//! A client starts with nothing but a list of seed endpoints. The
//! helpers here try them in uniform random order (so a fleet of
//! clients does not pile onto whichever node is listed first), run a
//! discovery pipeline over a throwaway connection, and open the real
//! connection to whatever endpoint discovery named.

use std::future::Future;

use rand::seq::SliceRandom;

use crate::config::ConnectionConfig;
use crate::connection::Connection;
use crate::discovery;
use crate::error::{Error, Result};
use crate::network::BrokerAddress;
use crate::protocol::CoordinatorType;

/// Try every endpoint once, in shuffled order, returning the first
/// connection that comes up. When they all fail, the error carries each
/// endpoint with its failure, in attempt order.
pub async fn connect_any(
    endpoints: &[BrokerAddress],
    config: &ConnectionConfig,
) -> Result<Connection> {
    let shuffled = random_order(endpoints);

    let mut failures = Vec::with_capacity(shuffled.len());
    for addr in shuffled {
        match Connection::start(&addr.host, addr.port, config.clone()).await {
            Ok(conn) => return Ok(conn),
            Err(error) => {
                tracing::debug!("Bootstrap endpoint {} failed: {}", addr, error);
                failures.push((addr, error));
            }
        }
    }
    Err(Error::FailedToConnect(failures))
}

/// Open a throwaway connection to any endpoint, run `body` on it, and
/// stop it on the way out whatever `body` returned.
pub async fn with_connection<T, F, Fut>(
    endpoints: &[BrokerAddress],
    config: &ConnectionConfig,
    body: F,
) -> Result<T>
where
    F: FnOnce(Connection) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let config = config.clone().nolink(true);
    let conn = connect_any(endpoints, &config).await?;

    let result = body(conn.clone()).await;

    // explicit stop on both paths; if body panics instead, the dropped
    // handles close the mailbox and the actor winds down anyway
    conn.stop().await?;
    result
}

/// Which connection to run discovery over: one the caller already has,
/// or a temporary one bootstrapped from seed endpoints.
#[derive(Clone, Copy, Debug)]
pub enum MetadataSource<'a> {
    Connection(&'a Connection),
    Endpoints(&'a [BrokerAddress]),
}

impl<'a> From<&'a Connection> for MetadataSource<'a> {
    fn from(conn: &'a Connection) -> Self {
        MetadataSource::Connection(conn)
    }
}

impl<'a> From<&'a [BrokerAddress]> for MetadataSource<'a> {
    fn from(endpoints: &'a [BrokerAddress]) -> Self {
        MetadataSource::Endpoints(endpoints)
    }
}

/// Discover the leader for a topic partition and connect to it.
pub async fn connect_partition_leader(
    source: MetadataSource<'_>,
    config: &ConnectionConfig,
    topic: &str,
    partition: i32,
) -> Result<Connection> {
    let deadline = config.request_timeout;
    let leader = match source {
        MetadataSource::Connection(conn) => {
            discovery::discover_partition_leader(conn, topic, partition, deadline).await?
        }
        MetadataSource::Endpoints(endpoints) => {
            with_connection(endpoints, config, |conn| async move {
                discovery::discover_partition_leader(&conn, topic, partition, deadline).await
            })
            .await?
        }
    };
    Connection::start(&leader.host, leader.port, config.clone()).await
}

/// Discover a group or transaction coordinator and connect to it.
pub async fn connect_coordinator(
    source: MetadataSource<'_>,
    config: &ConnectionConfig,
    coordinator_type: CoordinatorType,
    id: &str,
) -> Result<Connection> {
    let deadline = config.request_timeout;
    let coordinator = match source {
        MetadataSource::Connection(conn) => {
            discovery::discover_coordinator(conn, coordinator_type, id, deadline).await?
        }
        MetadataSource::Endpoints(endpoints) => {
            with_connection(endpoints, config, |conn| async move {
                discovery::discover_coordinator(&conn, coordinator_type, id, deadline).await
            })
            .await?
        }
    };
    Connection::start(&coordinator.host, coordinator.port, config.clone()).await
}

/// Shuffle endpoints into a uniform random attempt order.
fn random_order(endpoints: &[BrokerAddress]) -> Vec<BrokerAddress> {
    let mut shuffled = endpoints.to_vec();
    shuffled.shuffle(&mut rand::thread_rng());
    shuffled
}
