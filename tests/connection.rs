//! The connection actor against a scripted broker: multiplexing,
//! no-ack sends, timeouts, and teardown.

mod testsupport;

use std::time::Duration;

use bytes::Bytes;
use odradek::prelude::*;
use testsupport::{Action, MockBroker};

const DEADLINE: Duration = Duration::from_secs(5);

fn raw(api: ApiKey, body: &'static [u8]) -> KafkaRequest {
    KafkaRequest::new(api, 0, Bytes::from_static(body))
}

#[tokio::test]
async fn responses_reach_their_own_callers_regardless_of_order() {
    // hold the first request back until the second arrives, then
    // answer in reverse order
    let mut parked: Vec<(i32, Bytes)> = vec![];
    let broker = MockBroker::spawn(move |request| {
        parked.push((request.correlation_id, request.body));
        if parked.len() < 2 {
            return vec![];
        }
        parked
            .drain(..)
            .rev()
            .map(|(corr_id, body)| Action::Reply(corr_id, body))
            .collect()
    })
    .await;

    let conn = Connection::start(&broker.addr().host, broker.addr().port, Default::default())
        .await
        .unwrap();

    let first = conn
        .request_async(raw(ApiKey::Produce, b"first"))
        .await
        .unwrap()
        .unwrap();
    let second = conn
        .request_async(raw(ApiKey::Fetch, b"second"))
        .await
        .unwrap()
        .unwrap();

    // responses came back second-then-first; each waiter still gets
    // its own body
    assert_eq!(first.wait(DEADLINE).await.unwrap(), &b"first"[..]);
    assert_eq!(second.wait(DEADLINE).await.unwrap(), &b"second"[..]);

    conn.stop().await.unwrap();
}

#[tokio::test]
async fn no_ack_requests_leave_nothing_pending() {
    let broker = MockBroker::echo().await;
    let conn = Connection::start(&broker.addr().host, broker.addr().port, Default::default())
        .await
        .unwrap();

    let fire_and_forget = KafkaRequest::no_ack(ApiKey::Produce, 0, Bytes::from_static(b"acks=0"));
    assert!(conn.request_sync(fire_and_forget, DEADLINE).await.unwrap().is_none());

    // the next request observes that the no_ack send consumed id 0
    let response = conn
        .request_sync(raw(ApiKey::Produce, b"acked"), DEADLINE)
        .await
        .unwrap();
    assert_eq!(response.unwrap(), &b"acked"[..]);

    let info = conn.info().await.unwrap();
    assert_eq!(info.pending_requests, 0);
    assert_eq!(info.last_correlation_id, Some(1));

    conn.stop().await.unwrap();
}

#[tokio::test]
async fn client_id_rides_every_request_header() {
    let (seen_tx, mut seen_rx) = tokio::sync::mpsc::unbounded_channel();
    let broker = MockBroker::spawn(move |request| {
        seen_tx.send(request.client_id.clone()).unwrap();
        vec![Action::Reply(request.correlation_id, request.body)]
    })
    .await;

    let config = ConnectionConfig::new().client_id("tester-7");
    let conn = Connection::start(&broker.addr().host, broker.addr().port, config)
        .await
        .unwrap();
    conn.request_sync(raw(ApiKey::Metadata, b""), DEADLINE)
        .await
        .unwrap();

    assert_eq!(seen_rx.recv().await.unwrap(), "tester-7");
    conn.stop().await.unwrap();
}

#[tokio::test]
async fn sync_timeout_detaches_the_waiter_but_keeps_the_connection() {
    // answer nothing for the slow api, echo everything else
    let broker = MockBroker::spawn(|request| {
        if request.api_key == ApiKey::Fetch as i16 {
            vec![]
        } else {
            vec![Action::Reply(request.correlation_id, request.body)]
        }
    })
    .await;

    let conn = Connection::start(&broker.addr().host, broker.addr().port, Default::default())
        .await
        .unwrap();

    let err = conn
        .request_sync(raw(ApiKey::Fetch, b"slow"), Duration::from_millis(100))
        .await
        .unwrap_err();
    assert_eq!(err, Error::Timeout);

    // the abandoned entry stays pending, and the connection keeps working
    let info = conn.info().await.unwrap();
    assert_eq!(info.pending_requests, 1);

    let response = conn
        .request_sync(raw(ApiKey::Produce, b"alive"), DEADLINE)
        .await
        .unwrap();
    assert_eq!(response.unwrap(), &b"alive"[..]);

    conn.stop().await.unwrap();
}

#[tokio::test]
async fn peer_close_fails_outstanding_waiters() {
    let broker = MockBroker::spawn(|_| vec![Action::Close]).await;

    let conn = Connection::start(&broker.addr().host, broker.addr().port, Default::default())
        .await
        .unwrap();

    let err = conn
        .request_sync(raw(ApiKey::Metadata, b""), DEADLINE)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::TransportDown(_)), "{err:?}");
}

#[tokio::test]
async fn stale_request_timeout_kills_the_whole_connection() {
    // never answer anything
    let broker = MockBroker::spawn(|_| vec![]).await;

    let config = ConnectionConfig::new().request_timeout(Duration::from_secs(1));
    let conn = Connection::start(&broker.addr().host, broker.addr().port, config)
        .await
        .unwrap();

    // deadline far beyond the request timeout: the liveness check
    // fires first and the waiter learns the transport died
    let err = conn
        .request_sync(raw(ApiKey::Metadata, b""), Duration::from_secs(10))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::TransportDown(_)), "{err:?}");

    // the actor is gone
    let err = conn.request_sync(raw(ApiKey::Metadata, b""), DEADLINE).await.unwrap_err();
    assert!(matches!(err, Error::TransportDown(_)), "{err:?}");
}

#[tokio::test]
async fn stop_is_idempotent_and_fails_later_requests() {
    let broker = MockBroker::echo().await;
    let conn = Connection::start(&broker.addr().host, broker.addr().port, Default::default())
        .await
        .unwrap();

    conn.stop().await.unwrap();
    conn.stop().await.unwrap();

    let err = conn
        .request_sync(raw(ApiKey::Metadata, b""), DEADLINE)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::TransportDown(_)), "{err:?}");
}

#[tokio::test]
async fn info_reports_the_transport_shape() {
    let broker = MockBroker::echo().await;
    let conn = Connection::start(&broker.addr().host, broker.addr().port, Default::default())
        .await
        .unwrap();

    let info = conn.info().await.unwrap();

    assert_eq!(info.addr, broker.addr());
    assert_eq!(info.transport, TransportKind::Plain);
    assert!(info.peer_addr.is_some());
    assert!(info.local_addr.is_some());
    assert_eq!(info.pending_requests, 0);
    assert_eq!(info.last_correlation_id, None);
    assert_eq!(info.buffered_bytes, 0);

    conn.stop().await.unwrap();
}

#[tokio::test]
async fn debug_sink_traces_sends_and_receives() {
    let broker = MockBroker::echo().await;
    let conn = Connection::start(&broker.addr().host, broker.addr().port, Default::default())
        .await
        .unwrap();

    let path = std::env::temp_dir().join(format!(
        "odradek_debug_{}.log",
        std::process::id()
    ));
    conn.set_debug(DebugSink::File(path.clone())).await.unwrap();

    conn.request_sync(raw(ApiKey::Metadata, b"traced"), DEADLINE)
        .await
        .unwrap();
    conn.stop().await.unwrap();

    let trace = std::fs::read_to_string(&path).unwrap();
    assert!(trace.contains("corr_id=0 -> Metadata"), "{trace}");
    assert!(trace.contains("corr_id=0 <- Metadata"), "{trace}");
    std::fs::remove_file(path).ok();
}

#[tokio::test]
async fn dropping_a_linked_handle_shuts_the_actor_down() {
    let broker = MockBroker::echo().await;
    let conn = Connection::start(&broker.addr().host, broker.addr().port, Default::default())
        .await
        .unwrap();

    let clone = conn.clone();
    drop(conn);
    // one handle still alive; the actor must be too
    let response = clone
        .request_sync(raw(ApiKey::Metadata, b"still here"), DEADLINE)
        .await
        .unwrap();
    assert_eq!(response.unwrap(), &b"still here"[..]);

    drop(clone);
    // nothing left to ask the actor with; give the runtime a beat and
    // confirm the broker saw the socket close by serving a fresh
    // connection on the same listener
    tokio::time::sleep(Duration::from_millis(50)).await;
    let again = Connection::start(&broker.addr().host, broker.addr().port, Default::default())
        .await
        .unwrap();
    again.stop().await.unwrap();
}
