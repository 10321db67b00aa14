//! SASL authentication on a freshly established transport.
//!
//! The exchange is two-phased: a handshake request announces the
//! mechanism, then the mechanism's own tokens flow as raw
//! length-prefixed frames (the version 0 style, where the broker does
//! not wrap tokens in the request envelope). PLAIN is implemented
//! here; anything else comes in through the [`SaslAuthBackend`] seam
//! and runs its own exchange.

use std::time::Duration;

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};

use crate::encode::frame_request;
use crate::error::{Error, KafkaCode, Result};
use crate::network::Transport;
use crate::protocol::{
    HeaderRequest, SaslHandshakeRequest, SaslHandshakeResponse, HANDSHAKE_CORRELATION_ID,
};

pub const PLAIN_MECHANISM: &str = "PLAIN";

/// The raw token channel a SASL mechanism drives after its handshake.
///
/// Tokens travel as bare length-prefixed frames; the socket itself
/// stays hidden inside the connection machinery.
pub struct TokenExchange<'a> {
    transport: &'a mut Transport,
    deadline: Duration,
}

impl TokenExchange<'_> {
    /// Send one mechanism token.
    pub async fn send_token(&mut self, token: &[u8]) -> Result<()> {
        let mut frame = BytesMut::with_capacity(4 + token.len());
        frame.put_i32(token.len() as i32);
        frame.put(token);
        self.transport.send(&frame, self.deadline).await
    }

    /// Receive one mechanism token (possibly empty).
    pub async fn recv_token(&mut self) -> Result<Bytes> {
        self.transport.recv_frame(self.deadline).await
    }
}

/// A caller-provided SASL mechanism.
///
/// The backend gets the authenticated-to host and the token channel,
/// and drives whatever exchange its mechanism wants. The handshake
/// announcing the mechanism has already succeeded by the time this
/// runs.
#[async_trait]
pub trait SaslAuthBackend: Send + Sync {
    async fn auth(
        &self,
        host: &str,
        client_id: &str,
        exchange: &mut TokenExchange<'_>,
    ) -> Result<()>;
}

/// Announce a mechanism and check the broker accepts it.
pub(crate) async fn sasl_handshake(
    transport: &mut Transport,
    client_id: &str,
    mechanism: &str,
    deadline: Duration,
) -> Result<SaslHandshakeResponse> {
    let request = SaslHandshakeRequest::new(mechanism).into_request()?;
    let header = HeaderRequest::new(
        request.api,
        request.version,
        HANDSHAKE_CORRELATION_ID,
        client_id,
    );
    let frame = frame_request(&header, &request.body)?;

    transport.send(&frame, deadline).await?;
    let payload = transport.recv_frame(deadline).await?;

    // the reserved correlation id comes back first
    let (_, body) = crate::protocol::split_correlation_id(payload)?;
    let response = SaslHandshakeResponse::try_from(body)?;

    match response.error_code {
        KafkaCode::None => Ok(response),
        code => {
            tracing::error!("SASL handshake rejected: {:?} {:?}", code, response);
            Err(Error::KafkaError(code))
        }
    }
}

/// Run the PLAIN token exchange: one `\0user\0password` token out, one
/// empty ack token back.
pub(crate) async fn authenticate_plain(
    transport: &mut Transport,
    username: &str,
    password: &str,
    deadline: Duration,
) -> Result<()> {
    let mut token = BytesMut::with_capacity(2 + username.len() + password.len());
    token.put_u8(0);
    token.put(username.as_bytes());
    token.put_u8(0);
    token.put(password.as_bytes());

    let mut exchange = TokenExchange {
        transport,
        deadline,
    };
    exchange.send_token(&token).await?;

    // a broker that dislikes the credentials just hangs up
    let ack = exchange.recv_token().await.map_err(|e| match e {
        Error::TransportClosed => Error::SaslAuthFailed("bad credentials".into()),
        other => other,
    })?;

    if !ack.is_empty() {
        tracing::warn!("unexpected payload in SASL PLAIN ack: {:?}", ack);
    }
    tracing::debug!("SASL PLAIN authentication accepted for {}", username);
    Ok(())
}

/// Hand the token channel to a callback mechanism.
pub(crate) async fn authenticate_callback(
    transport: &mut Transport,
    host: &str,
    client_id: &str,
    backend: &dyn SaslAuthBackend,
    deadline: Duration,
) -> Result<()> {
    let mut exchange = TokenExchange {
        transport,
        deadline,
    };
    backend.auth(host, client_id, &mut exchange).await
}
