//! Shared test helpers: an in-process scripted broker.
//!
//! Each test spawns a `MockBroker` with a responder closure; the broker
//! accepts connections, parses framed requests down to the header, and
//! writes back whatever frames the responder scripts. No real cluster
//! anywhere.
#![allow(dead_code)]

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use odradek::prelude::*;

/// One decoded request as seen by the broker.
#[derive(Debug)]
pub struct ParsedRequest {
    pub api_key: i16,
    pub api_version: i16,
    pub correlation_id: i32,
    pub client_id: String,
    pub body: Bytes,
}

/// What the responder wants done after a request arrives.
pub enum Action {
    /// Write a response frame with this correlation id and body.
    Reply(i32, Bytes),
    /// Hang up on the client.
    Close,
}

pub struct MockBroker {
    addr: BrokerAddress,
    handle: JoinHandle<()>,
}

impl MockBroker {
    /// Serve connections, feeding every request through `respond`.
    pub async fn spawn<F>(mut respond: F) -> MockBroker
    where
        F: FnMut(ParsedRequest) -> Vec<Action> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let handle = tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                'conn: loop {
                    let Some(request) = read_request(&mut stream).await else {
                        break 'conn;
                    };
                    for action in respond(request) {
                        match action {
                            Action::Reply(correlation_id, body) => {
                                write_reply(&mut stream, correlation_id, &body).await;
                            }
                            Action::Close => break 'conn,
                        }
                    }
                }
            }
        });

        MockBroker {
            addr: BrokerAddress::new("127.0.0.1", port),
            handle,
        }
    }

    /// A broker that answers every request with its own body echoed
    /// back, which makes responses easy to tell apart in tests.
    pub async fn echo() -> MockBroker {
        Self::spawn(|request| vec![Action::Reply(request.correlation_id, request.body)]).await
    }

    pub fn addr(&self) -> BrokerAddress {
        self.addr.clone()
    }

    pub fn endpoints(&self) -> Vec<BrokerAddress> {
        vec![self.addr()]
    }
}

impl Drop for MockBroker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn read_request(stream: &mut TcpStream) -> Option<ParsedRequest> {
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).await.ok()?;
    let len = i32::from_be_bytes(len_buf);
    assert!(len >= 0, "client sent a negative frame length");

    let mut payload = vec![0u8; len as usize];
    stream.read_exact(&mut payload).await.ok()?;

    let mut buf = Bytes::from(payload);
    let api_key = buf.get_i16();
    let api_version = buf.get_i16();
    let correlation_id = buf.get_i32();
    let id_len = buf.get_i16() as usize;
    let client_id = String::from_utf8(buf.split_to(id_len).to_vec()).unwrap();

    Some(ParsedRequest {
        api_key,
        api_version,
        correlation_id,
        client_id,
        body: buf,
    })
}

pub async fn write_reply(stream: &mut TcpStream, correlation_id: i32, body: &[u8]) {
    let mut frame = BytesMut::with_capacity(8 + body.len());
    frame.put_i32(4 + body.len() as i32);
    frame.put_i32(correlation_id);
    frame.put(body);
    stream.write_all(&frame).await.unwrap();
}

/// Read one raw (headerless) frame, as the SASL token exchange uses.
pub async fn read_raw_frame(stream: &mut TcpStream) -> Option<Bytes> {
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).await.ok()?;
    let len = i32::from_be_bytes(len_buf);
    assert!(len >= 0);
    let mut payload = vec![0u8; len as usize];
    stream.read_exact(&mut payload).await.ok()?;
    Some(Bytes::from(payload))
}

/// Write one raw (headerless) frame.
pub async fn write_raw_frame(stream: &mut TcpStream, payload: &[u8]) {
    let mut frame = BytesMut::with_capacity(4 + payload.len());
    frame.put_i32(payload.len() as i32);
    frame.put(payload);
    stream.write_all(&frame).await.unwrap();
}

fn put_str(buf: &mut BytesMut, s: &str) {
    buf.put_i16(s.len() as i16);
    buf.put(s.as_bytes());
}

/// ApiVersions v0 response body: no error, the given
/// `(api_key, min, max)` triples.
pub fn api_versions_body(entries: &[(i16, i16, i16)]) -> Bytes {
    let mut buf = BytesMut::new();
    buf.put_i16(0);
    buf.put_i32(entries.len() as i32);
    for (api_key, min, max) in entries {
        buf.put_i16(*api_key);
        buf.put_i16(*min);
        buf.put_i16(*max);
    }
    buf.freeze()
}

/// ApiVersions v0 response body carrying an error code.
pub fn api_versions_error_body(error_code: i16) -> Bytes {
    let mut buf = BytesMut::new();
    buf.put_i16(error_code);
    buf.put_i32(0);
    buf.freeze()
}

/// The version triples a well-behaved modern broker would advertise
/// for the APIs this client negotiates.
pub fn modern_broker_versions() -> Vec<(i16, i16, i16)> {
    vec![(3, 0, 8), (10, 0, 4), (17, 0, 1), (18, 0, 3)]
}

/// Metadata v0 response body. Partitions are `(error_code,
/// partition_index, leader_id)`; replicas and isr mirror the leader.
pub fn metadata_body(
    brokers: &[(i32, &str, i32)],
    topics: &[(i16, &str, Vec<(i16, i32, i32)>)],
) -> Bytes {
    let mut buf = BytesMut::new();

    buf.put_i32(brokers.len() as i32);
    for (node_id, host, port) in brokers {
        buf.put_i32(*node_id);
        put_str(&mut buf, host);
        buf.put_i32(*port);
    }

    buf.put_i32(topics.len() as i32);
    for (error_code, name, partitions) in topics {
        buf.put_i16(*error_code);
        put_str(&mut buf, name);
        buf.put_i32(partitions.len() as i32);
        for (p_error, index, leader) in partitions {
            buf.put_i16(*p_error);
            buf.put_i32(*index);
            buf.put_i32(*leader);
            buf.put_i32(1);
            buf.put_i32(*leader);
            buf.put_i32(1);
            buf.put_i32(*leader);
        }
    }

    buf.freeze()
}

/// FindCoordinator v0 response body.
pub fn find_coordinator_body_v0(error_code: i16, node_id: i32, host: &str, port: i32) -> Bytes {
    let mut buf = BytesMut::new();
    buf.put_i16(error_code);
    buf.put_i32(node_id);
    put_str(&mut buf, host);
    buf.put_i32(port);
    buf.freeze()
}

/// FindCoordinator v1 response body.
pub fn find_coordinator_body_v1(
    error_code: i16,
    error_message: Option<&str>,
    node_id: i32,
    host: &str,
    port: i32,
) -> Bytes {
    let mut buf = BytesMut::new();
    buf.put_i32(0); // throttle_time_ms
    buf.put_i16(error_code);
    match error_message {
        Some(message) => put_str(&mut buf, message),
        None => buf.put_i16(-1),
    }
    buf.put_i32(node_id);
    put_str(&mut buf, host);
    buf.put_i32(port);
    buf.freeze()
}
