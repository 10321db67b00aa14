//! Table of in-flight requests awaiting responses.
//!
//! Every request sent on a connection consumes one correlation id; the
//! broker echoes it back so the response can find its caller. Ids are
//! handed out in send order, so insertion order doubles as age order
//! and the liveness check can read the oldest entry without scanning.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::sync::oneshot;

use crate::error::{Error, Result};
use crate::protocol::{ApiKey, HANDSHAKE_CORRELATION_ID};

/// One request on the wire without a response yet.
#[derive(Debug)]
pub struct PendingRequest {
    pub api: ApiKey,
    pub version: i16,
    /// Where the response body goes. A closed channel means the caller
    /// gave up; the response is dropped on the floor when it lands.
    pub waiter: oneshot::Sender<Result<Bytes>>,
    pub sent_at: Instant,
}

/// Correlation-id allocator plus the id → waiter map.
///
/// Ids run 0 ..= `i32::MAX - 2` and wrap; `i32::MAX` is reserved for
/// handshake requests so the application space starts clean at 0.
#[derive(Debug, Default)]
pub struct PendingRequests {
    next_corr_id: i32,
    last_corr_id: Option<i32>,
    by_id: HashMap<i32, PendingRequest>,
    order: VecDeque<i32>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next correlation id and register a waiter under it.
    ///
    /// The id space is large enough and the request timeout short
    /// enough that a wrap onto a live entry should never happen; if it
    /// does, something is deeply wrong and the connection must die
    /// rather than misdeliver a response.
    pub fn add(
        &mut self,
        api: ApiKey,
        version: i16,
        waiter: oneshot::Sender<Result<Bytes>>,
    ) -> Result<i32> {
        let corr_id = self.allocate();
        if self.by_id.contains_key(&corr_id) {
            return Err(Error::CorrelationIdCollision);
        }

        self.by_id.insert(
            corr_id,
            PendingRequest {
                api,
                version,
                waiter,
                sent_at: Instant::now(),
            },
        );
        self.order.push_back(corr_id);
        Ok(corr_id)
    }

    /// Consume a correlation id without registering a waiter.
    ///
    /// Used for `no_ack` requests: the id still goes on the wire so the
    /// sequence stays contiguous, but nothing will ever come back for it.
    pub fn increment(&mut self) -> i32 {
        self.allocate()
    }

    pub fn remove(&mut self, corr_id: i32) -> Option<PendingRequest> {
        self.by_id.remove(&corr_id)
    }

    /// Age of the earliest-inserted live entry; zero when empty.
    ///
    /// Entries removed out of order leave their id behind in the order
    /// queue; stale front ids get popped here, keeping the check O(1)
    /// amortized.
    pub fn oldest_age(&mut self) -> Duration {
        while let Some(front) = self.order.front() {
            match self.by_id.get(front) {
                Some(pending) => return pending.sent_at.elapsed(),
                None => {
                    self.order.pop_front();
                }
            }
        }
        Duration::ZERO
    }

    /// The most recently allocated id, for debug output.
    pub fn last_corr_id(&self) -> Option<i32> {
        self.last_corr_id
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Tear the table down, yielding every live waiter.
    pub fn drain(&mut self) -> impl Iterator<Item = PendingRequest> + '_ {
        self.order.clear();
        self.by_id.drain().map(|(_, pending)| pending)
    }

    fn allocate(&mut self) -> i32 {
        let corr_id = self.next_corr_id;
        // skip the reserved handshake id on wrap
        self.next_corr_id = if corr_id == HANDSHAKE_CORRELATION_ID - 1 {
            0
        } else {
            corr_id + 1
        };
        self.last_corr_id = Some(corr_id);
        corr_id
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn waiter() -> (
        oneshot::Sender<Result<Bytes>>,
        oneshot::Receiver<Result<Bytes>>,
    ) {
        oneshot::channel()
    }

    #[test]
    fn ids_are_allocated_in_send_order() {
        let mut pending = PendingRequests::new();

        for expected in 0..5 {
            let (tx, _rx) = waiter();
            let corr_id = pending.add(ApiKey::Metadata, 0, tx).unwrap();
            assert_eq!(corr_id, expected);
        }
        assert_eq!(pending.last_corr_id(), Some(4));
        assert_eq!(pending.len(), 5);
    }

    #[test]
    fn increment_consumes_an_id_without_a_waiter() {
        let mut pending = PendingRequests::new();

        assert_eq!(pending.increment(), 0);
        assert!(pending.is_empty());

        let (tx, _rx) = waiter();
        assert_eq!(pending.add(ApiKey::Produce, 0, tx).unwrap(), 1);
    }

    #[test]
    fn wrap_skips_the_reserved_handshake_id() {
        let mut pending = PendingRequests {
            next_corr_id: HANDSHAKE_CORRELATION_ID - 1,
            ..Default::default()
        };

        assert_eq!(pending.increment(), HANDSHAKE_CORRELATION_ID - 1);
        assert_eq!(pending.increment(), 0);
    }

    #[test]
    fn wrap_onto_a_live_entry_is_detected() {
        let mut pending = PendingRequests::new();
        let (tx, _rx) = waiter();
        pending.add(ApiKey::Metadata, 0, tx).unwrap();

        pending.next_corr_id = 0;
        let (tx, _rx) = waiter();
        let err = pending.add(ApiKey::Metadata, 0, tx).unwrap_err();

        assert_eq!(err, Error::CorrelationIdCollision);
    }

    #[test]
    fn oldest_age_tracks_the_surviving_earliest_entry() {
        let mut pending = PendingRequests::new();
        assert_eq!(pending.oldest_age(), Duration::ZERO);

        let (tx0, _rx0) = waiter();
        let first = pending.add(ApiKey::Metadata, 0, tx0).unwrap();
        std::thread::sleep(Duration::from_millis(5));
        let (tx1, _rx1) = waiter();
        let second = pending.add(ApiKey::Metadata, 0, tx1).unwrap();

        let age_with_first = pending.oldest_age();
        assert!(age_with_first >= Duration::from_millis(5));

        // removing the oldest promotes the younger entry
        pending.remove(first);
        assert!(pending.oldest_age() < age_with_first);

        pending.remove(second);
        assert_eq!(pending.oldest_age(), Duration::ZERO);
    }

    #[test]
    fn drain_yields_every_live_waiter() {
        let mut pending = PendingRequests::new();
        let (tx0, _rx0) = waiter();
        let (tx1, _rx1) = waiter();
        pending.add(ApiKey::Metadata, 0, tx0).unwrap();
        pending.add(ApiKey::Fetch, 0, tx1).unwrap();

        assert_eq!(pending.drain().count(), 2);
        assert!(pending.is_empty());
        assert_eq!(pending.oldest_age(), Duration::ZERO);
    }
}
