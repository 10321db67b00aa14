//! One-shot handshake that promotes a raw socket into a ready transport.
//!
//! ```text
//! init → tcp_connected → [tls_upgraded] → [sasl_handshaked → sasl_authed] → ready
//! ```
//!
//! Runs once per socket, synchronously and deadline-bounded, before the
//! connection task takes over. Misconfigured listeners are by far the
//! most common way this fails in the field (plaintext client against an
//! `SSL://` listener and every other permutation), so failures here get
//! a hint about which listener type the config looks like it wanted.

use crate::config::{ConnectionConfig, SaslConfig};
use crate::error::{Error, KafkaCode, Result};
use crate::network::{sasl, BrokerAddress, Transport};

/// Where in the handshake a failure happened; drives the hint table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum HandshakePhase {
    TlsUpgrade,
    SaslExchange,
}

/// Connect, upgrade, authenticate. Failures are logged with a
/// diagnosis hint before they propagate.
pub(crate) async fn establish(
    addr: &BrokerAddress,
    config: &ConnectionConfig,
) -> Result<Transport> {
    match establish_inner(addr, config).await {
        Ok(transport) => Ok(transport),
        Err((phase, error)) => {
            match phase.and_then(|phase| diagnose(phase, &error, config)) {
                Some(hint) => {
                    tracing::error!("Connection to {} failed: {}. {}", addr, error, hint)
                }
                None => tracing::error!("Connection to {} failed: {}", addr, error),
            }
            Err(error)
        }
    }
}

async fn establish_inner(
    addr: &BrokerAddress,
    config: &ConnectionConfig,
) -> std::result::Result<Transport, (Option<HandshakePhase>, Error)> {
    let mut transport = Transport::connect(addr, config).await.map_err(|e| {
        let phase = matches!(e, Error::FailedToUpgradeToTls(_)).then_some(HandshakePhase::TlsUpgrade);
        (phase, e)
    })?;

    if config.sasl.is_enabled() {
        authenticate(&mut transport, addr, config)
            .await
            .map_err(|e| (Some(HandshakePhase::SaslExchange), e))?;
    }

    Ok(transport)
}

async fn authenticate(
    transport: &mut Transport,
    addr: &BrokerAddress,
    config: &ConnectionConfig,
) -> Result<()> {
    let deadline = config.connect_timeout;

    match &config.sasl {
        SaslConfig::Off => Ok(()),
        SaslConfig::Plain { .. } | SaslConfig::PlainFile(_) => {
            let (username, password) = config
                .sasl
                .plain_credentials()?
                .ok_or_else(|| Error::ConfigError("missing PLAIN credentials".into()))?;

            sasl::sasl_handshake(transport, &config.client_id, sasl::PLAIN_MECHANISM, deadline)
                .await?;
            sasl::authenticate_plain(transport, &username, &password, deadline).await
        }
        SaslConfig::Callback { mechanism, backend } => {
            sasl::sasl_handshake(transport, &config.client_id, mechanism, deadline).await?;
            sasl::authenticate_callback(
                transport,
                &addr.host,
                &config.client_id,
                backend.as_ref(),
                deadline,
            )
            .await
        }
    }
}

/// The listener-mismatch hint table, pure so it can be tested alone.
pub(crate) fn diagnose(
    phase: HandshakePhase,
    error: &Error,
    config: &ConnectionConfig,
) -> Option<&'static str> {
    let tls = config.tls.is_enabled();
    let sasl = config.sasl.is_enabled();

    match (phase, error) {
        (HandshakePhase::TlsUpgrade, _) if sasl => {
            Some("Make sure connecting to a 'SASL_SSL://' listener")
        }
        (HandshakePhase::TlsUpgrade, _) => Some("Make sure connecting to a 'SSL://' listener"),
        (HandshakePhase::SaslExchange, Error::KafkaError(KafkaCode::IllegalSaslState)) => {
            if tls {
                Some("Make sure connecting to a 'SASL_SSL://' listener")
            } else {
                Some("Make sure connecting to a 'SASL_PLAINTEXT://' listener")
            }
        }
        // garbage or a hangup mid-exchange on a plaintext socket reads
        // like the server was speaking TLS at us
        (
            HandshakePhase::SaslExchange,
            Error::SaslAuthFailed(_)
            | Error::TransportClosed
            | Error::ParsingError(_)
            | Error::Timeout,
        ) if !tls => {
            Some("Add TLS to the config, or connect to a 'SASL_PLAINTEXT://' listener")
        }
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use bytes::Bytes;

    use super::*;
    use crate::config::TlsConfig;

    fn config(tls: bool, sasl: bool) -> ConnectionConfig {
        let mut config = ConnectionConfig::default();
        if tls {
            config.tls = TlsConfig::On;
        }
        if sasl {
            config.sasl = SaslConfig::Plain {
                username: "u".into(),
                password: "p".into(),
            };
        }
        config
    }

    #[test]
    fn tls_failure_without_sasl_points_at_ssl_listener() {
        let hint = diagnose(
            HandshakePhase::TlsUpgrade,
            &Error::FailedToUpgradeToTls("handshake timed out".into()),
            &config(true, false),
        );

        assert_eq!(hint, Some("Make sure connecting to a 'SSL://' listener"));
    }

    #[test]
    fn tls_failure_with_sasl_points_at_sasl_ssl_listener() {
        let hint = diagnose(
            HandshakePhase::TlsUpgrade,
            &Error::FailedToUpgradeToTls("handshake timed out".into()),
            &config(true, true),
        );

        assert_eq!(
            hint,
            Some("Make sure connecting to a 'SASL_SSL://' listener")
        );
    }

    #[test]
    fn illegal_sasl_state_depends_on_tls() {
        let err = Error::KafkaError(KafkaCode::IllegalSaslState);

        assert_eq!(
            diagnose(HandshakePhase::SaslExchange, &err, &config(true, true)),
            Some("Make sure connecting to a 'SASL_SSL://' listener")
        );
        assert_eq!(
            diagnose(HandshakePhase::SaslExchange, &err, &config(false, true)),
            Some("Make sure connecting to a 'SASL_PLAINTEXT://' listener")
        );
    }

    #[test]
    fn plaintext_sasl_garbage_suggests_tls() {
        for err in [
            Error::SaslAuthFailed("bad credentials".into()),
            Error::TransportClosed,
            Error::ParsingError(Bytes::from_static(&[0x16, 0x03])),
        ] {
            assert_eq!(
                diagnose(HandshakePhase::SaslExchange, &err, &config(false, true)),
                Some("Add TLS to the config, or connect to a 'SASL_PLAINTEXT://' listener"),
                "{err:?}"
            );
        }
    }

    #[test]
    fn real_auth_rejections_over_tls_carry_no_hint() {
        let hint = diagnose(
            HandshakePhase::SaslExchange,
            &Error::SaslAuthFailed("bad credentials".into()),
            &config(true, true),
        );

        assert_eq!(hint, None);
    }
}
