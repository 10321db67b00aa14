//! Encoding and creation for Find Coordinator requests.
//!
//! The offsets for a given consumer group are maintained by a
//! specific broker called the group coordinator. i.e., a consumer
//! needs to issue its offset commit and fetch requests to this
//! specific broker. It can discover the current coordinator by
//! issuing a find coordinator request. Since version 1 the same
//! request also locates the transaction coordinator for a
//! transactional producer id.
//!
//! ### Example
//! ```rust,ignore
//! let find_coordinator_request =
//!     protocol::FindCoordinatorRequest::new(group_id, CoordinatorType::Group, version)?;
//! conn.request_sync(find_coordinator_request.into_request()?, timeout).await?;
//! ```
//!
//! ### Protocol Def
//! ```text
//! FindCoordinator Request (Version: 0) => key
//!   key => STRING
//! FindCoordinator Request (Version: 1) => key key_type
//!   key => STRING
//!   key_type => INT8
//! ```

use bytes::{BufMut, Bytes};

use crate::{
    encode::ToByte,
    error::{Error, Result},
    protocol::{ApiKey, KafkaRequest},
};

/// Which kind of coordinator is being looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorType {
    Group,
    Transaction,
}

impl CoordinatorType {
    fn key_type(self) -> i8 {
        match self {
            CoordinatorType::Group => 0,
            CoordinatorType::Transaction => 1,
        }
    }
}

/// The base Find Coordinator request object.
///
/// ### Example
/// ```rust,ignore
/// let find_coordinator_request =
///     protocol::FindCoordinatorRequest::new(group_id, CoordinatorType::Group, version)?;
/// conn.request_sync(find_coordinator_request.into_request()?, timeout).await?;
/// ```
#[derive(Debug)]
pub struct FindCoordinatorRequest<'a> {
    /// The coordinator key: a group id or a transactional id.
    pub key: &'a str,
    /// The coordinator key type.
    pub key_type: CoordinatorType,
    version: i16,
}

impl<'a> FindCoordinatorRequest<'a> {
    /// Version 0 only knows group coordinators; asking it for a
    /// transaction coordinator fails before anything touches the wire.
    pub fn new(key: &'a str, key_type: CoordinatorType, version: i16) -> Result<Self> {
        if version == 0 && key_type == CoordinatorType::Transaction {
            return Err(Error::BadVersion(
                "find_coordinator v0 only supports group lookups".into(),
            ));
        }
        Ok(Self {
            key,
            key_type,
            version,
        })
    }

    /// Encode the body and wrap it for the multiplexer.
    pub fn into_request(self) -> Result<KafkaRequest> {
        let version = self.version;
        let mut body = vec![];
        self.encode(&mut body)?;
        Ok(KafkaRequest::new(
            ApiKey::FindCoordinator,
            version,
            Bytes::from(body),
        ))
    }
}

impl<'a> ToByte for FindCoordinatorRequest<'a> {
    fn encode<T: BufMut>(&self, buffer: &mut T) -> Result<()> {
        tracing::trace!("Encoding FindCoordinatorRequest {:?}", self);
        self.key.encode(buffer)?;
        if self.version >= 1 {
            self.key_type.key_type().encode(buffer)?;
        }
        Ok(())
    }
}
