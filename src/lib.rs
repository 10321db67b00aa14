//! # Odradek
//! Rust-native Kafka broker connection and cluster discovery core.
//!
//! This crate provides the low level machinery every Kafka client needs
//! before it can do anything interesting: a framed TCP (or TLS)
//! transport, a connection task that multiplexes concurrent requests
//! over one socket by correlation id, the TLS/SASL pre-flight
//! handshake, API version negotiation, and the discovery pipelines that
//! turn a bootstrap list into the partition leader or coordinator
//! connection a producer or consumer actually wants.
//!
//! ## Goals
//! - Easy to understand code
//! - Leverage best in class libraries such as Tokio, Nom to do the heavy lifting
//! - One task owns each socket; callers never share a stream
//! - Be a good building block for future works based around Kafka
//!
//! ## Getting started
//! Connections start from a host, port, and a [`ConnectionConfig`](prelude::ConnectionConfig):
//! ```rust
//! use odradek::prelude::*;
//!
//! # async fn run() -> Result<()> {
//! let conn = Connection::start("localhost", 9092, ConnectionConfig::default()).await?;
//!
//! let leader = discover_partition_leader(&conn, "my-topic", 0, std::time::Duration::from_secs(5)).await?;
//! println!("leader lives at {leader}");
//!
//! conn.stop().await?;
//! # Ok(())
//! # }
//! ```
//!
//! Starting from nothing but a seed list, the bootstrap helpers run
//! discovery over a throwaway connection and hand back the one you
//! wanted:
//! ```rust
//! use odradek::prelude::*;
//!
//! # async fn run() -> Result<()> {
//! let seeds = vec![
//!     BrokerAddress::new("kafka-1", 9092),
//!     BrokerAddress::new("kafka-2", 9092),
//! ];
//! let config = ConnectionConfig::default();
//!
//! let leader = connect_partition_leader(
//!     MetadataSource::Endpoints(&seeds),
//!     &config,
//!     "my-topic",
//!     0,
//! )
//! .await?;
//! # Ok(())
//! # }
//! ```
//!
//! Anything with a hand-encoded body rides the same multiplexer:
//! ```rust
//! use odradek::prelude::*;
//!
//! # async fn run(conn: Connection, body: bytes::Bytes) -> Result<()> {
//! let request = KafkaRequest::new(ApiKey::Fetch, 4, body);
//! let response = conn
//!     .request_sync(request, std::time::Duration::from_secs(30))
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Resources
//! - [Kafka Protocol Spec](https://kafka.apache.org/protocol.html)
//! - [Confluence Docs](https://cwiki.apache.org/confluence/display/KAFKA/A+Guide+To+The+Kafka+Protocol)

mod bootstrap;
mod config;
mod connection;
mod discovery;
mod encode;
mod error;
mod frame;
mod network;
mod parser;
mod pending;
mod protocol;
mod versions;

pub mod prelude {
    //! Main export of the connection, discovery, and bootstrap surface.
    //!
    //! Everything here rides one abstraction: a [`Connection`] is a
    //! handle to a task that owns a socket. Requests go in from any
    //! task; responses come back to whoever asked, matched by
    //! correlation id. The free functions layer discovery and
    //! bootstrap flows over such handles.

    pub use crate::bootstrap::{
        connect_any, connect_coordinator, connect_partition_leader, with_connection,
        MetadataSource,
    };
    pub use crate::config::{
        ConnectionConfig, DebugSink, SaslConfig, TlsConfig, TlsOptions, DEFAULT_CLIENT_ID,
        DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT,
    };
    pub use crate::connection::{Connection, ConnectionInfo, PendingResponse};
    pub use crate::discovery::{discover_coordinator, discover_partition_leader};
    pub use crate::error::{Error, KafkaCode, Result};
    pub use crate::network::sasl::{SaslAuthBackend, TokenExchange};
    pub use crate::network::{BrokerAddress, TransportKind};
    pub use crate::protocol::{ApiKey, CoordinatorType, KafkaRequest};
    pub use crate::versions::VersionRanges;

    pub use bytes;

    pub mod protocol {
        pub use crate::protocol::*;
    }

    pub mod encode {
        pub use crate::encode::*;
    }
}
