//! Reassembly of length-prefixed frames from an arbitrary byte stream.
//!
//! Kafka messages are size delimited: every frame on the wire is a
//! big-endian signed 32-bit payload length followed by that many bytes.
//! The socket hands the connection arbitrary chunks, so the accumulator
//! sits between the two and buffers until whole frames fall out.

use bytes::{Bytes, BytesMut};

use crate::error::{Error, Result};

/// Frame reassembly buffer.
///
/// Either still gathering the 4-byte length header, or gathering a body
/// whose total size is already known. Feeding bytes drains zero or more
/// complete frames; trailing bytes stay buffered for the next read.
#[derive(Debug, Default)]
pub struct FrameAccumulator {
    state: State,
}

#[derive(Debug)]
enum State {
    /// Raw bytes of a partial length header, always fewer than 4.
    GatheringHeader(BytesMut),
    /// Body bytes being collected toward a known total.
    ///
    /// `expected` and `accumulated` both count the 4 header bytes, so a
    /// frame is whole when `accumulated == expected`.
    GatheringBody {
        expected: usize,
        accumulated: usize,
        chunks: Vec<Bytes>,
    },
}

impl Default for State {
    fn default() -> Self {
        State::GatheringHeader(BytesMut::new())
    }
}

impl FrameAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk off the socket, draining every frame it completes.
    ///
    /// Returned frames are the payload only; the length prefix has done
    /// its job by then. A negative length on the wire is unrecoverable
    /// and fails the connection.
    pub fn feed(&mut self, mut chunk: Bytes) -> Result<Vec<Bytes>> {
        let mut frames = vec![];

        loop {
            match &mut self.state {
                State::GatheringHeader(buf) => {
                    if buf.len() + chunk.len() < 4 {
                        buf.extend_from_slice(&chunk);
                        return Ok(frames);
                    }

                    let missing = 4 - buf.len();
                    buf.extend_from_slice(&chunk.split_to(missing));
                    let length = i32::from_be_bytes(buf[..4].try_into().expect("4 byte header"));
                    if length < 0 {
                        return Err(Error::ProtocolError(format!(
                            "negative frame length {length}"
                        )));
                    }

                    self.state = State::GatheringBody {
                        expected: 4 + length as usize,
                        accumulated: 4,
                        chunks: vec![],
                    };
                }
                State::GatheringBody {
                    expected,
                    accumulated,
                    chunks,
                } => {
                    let missing = *expected - *accumulated;
                    if chunk.is_empty() && missing > 0 {
                        return Ok(frames);
                    }

                    let take = missing.min(chunk.len());
                    if take > 0 {
                        chunks.push(chunk.split_to(take));
                        *accumulated += take;
                    }

                    if *accumulated < *expected {
                        return Ok(frames);
                    }

                    let payload_len = *expected - 4;
                    let mut payload = BytesMut::with_capacity(payload_len);
                    for piece in chunks.drain(..) {
                        payload.extend_from_slice(&piece);
                    }
                    frames.push(payload.freeze());

                    self.state = State::GatheringHeader(BytesMut::new());
                }
            }
        }
    }

    /// Total frame size currently being gathered, header included.
    /// `None` while still reading the length header.
    pub fn expected_size(&self) -> Option<usize> {
        match &self.state {
            State::GatheringHeader(_) => None,
            State::GatheringBody { expected, .. } => Some(*expected),
        }
    }

    /// How many bytes of the current frame (or partial header) are
    /// buffered.
    pub fn accumulated(&self) -> usize {
        match &self.state {
            State::GatheringHeader(buf) => buf.len(),
            State::GatheringBody { accumulated, .. } => *accumulated,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(&self.state, State::GatheringHeader(buf) if buf.is_empty())
    }
}
