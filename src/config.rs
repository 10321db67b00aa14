//! Connection configuration.
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::network::sasl::SaslAuthBackend;

pub const DEFAULT_CLIENT_ID: &str = "odradek_default";
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(240);

/// Everything a connection needs to know before it dials out.
///
/// `Default` gives a plaintext, unauthenticated connection with the
/// stock timeouts; builder-style setters cover the rest.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Deadline for TCP connect and, when enabled, the TLS upgrade.
    pub connect_timeout: Duration,
    /// How long the oldest in-flight request may go unanswered before
    /// the connection is declared dead. Must be at least one second.
    pub request_timeout: Duration,
    /// Client id stamped into every request header.
    pub client_id: String,
    /// When set, the connection's lifetime is not tied to the handles
    /// that refer to it; it lives until stopped or the socket dies.
    pub nolink: bool,
    pub tls: TlsConfig,
    pub sasl: SaslConfig,
    pub debug: DebugSink,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            client_id: DEFAULT_CLIENT_ID.to_owned(),
            nolink: false,
            tls: TlsConfig::Off,
            sasl: SaslConfig::Off,
            debug: DebugSink::Off,
        }
    }
}

impl ConnectionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    pub fn nolink(mut self, nolink: bool) -> Self {
        self.nolink = nolink;
        self
    }

    pub fn tls(mut self, tls: TlsConfig) -> Self {
        self.tls = tls;
        self
    }

    pub fn sasl(mut self, sasl: SaslConfig) -> Self {
        self.sasl = sasl;
        self
    }

    pub fn debug(mut self, debug: DebugSink) -> Self {
        self.debug = debug;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.request_timeout < Duration::from_secs(1) {
            return Err(Error::ConfigError(
                "request_timeout must be at least one second".into(),
            ));
        }
        Ok(())
    }
}

/// Whether and how to upgrade the socket to TLS.
#[derive(Debug, Clone, Default)]
pub enum TlsConfig {
    #[default]
    Off,
    /// TLS with the webpki root store and no client certificate.
    On,
    /// TLS with explicit trust and/or client identity.
    Custom(TlsOptions),
}

impl TlsConfig {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, TlsConfig::Off)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TlsOptions {
    /// PEM bundle of roots to trust instead of the webpki set.
    pub cafile: Option<PathBuf>,
    /// Client certificate chain and PKCS#8 key for mutual TLS.
    pub cert: Option<PathBuf>,
    pub key: Option<PathBuf>,
}

/// SASL Credentials.
#[derive(Clone, Default)]
pub enum SaslConfig {
    #[default]
    Off,
    /// SASL/PLAIN with inline credentials.
    Plain { username: String, password: String },
    /// SASL/PLAIN with credentials read from a two-line file
    /// (username, then password; blank lines ignored).
    PlainFile(PathBuf),
    /// A caller-provided mechanism that runs its own token exchange.
    Callback {
        mechanism: String,
        backend: Arc<dyn SaslAuthBackend>,
    },
}

impl SaslConfig {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, SaslConfig::Off)
    }

    /// Resolve the PLAIN credential pair, reading the credentials file
    /// if that is where they live.
    pub(crate) fn plain_credentials(&self) -> Result<Option<(String, String)>> {
        match self {
            SaslConfig::Plain { username, password } => {
                Ok(Some((username.clone(), password.clone())))
            }
            SaslConfig::PlainFile(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    Error::ConfigError(format!(
                        "unable to read credentials file {}: {e}",
                        path.display()
                    ))
                })?;
                let mut lines = text.lines().filter(|l| !l.trim().is_empty());
                let username = lines.next();
                let password = lines.next();
                match (username, password) {
                    (Some(u), Some(p)) => Ok(Some((u.to_owned(), p.to_owned()))),
                    _ => Err(Error::ConfigError(format!(
                        "credentials file {} needs a username line and a password line",
                        path.display()
                    ))),
                }
            }
            _ => Ok(None),
        }
    }
}

impl fmt::Debug for SaslConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaslConfig::Off => write!(f, "Off"),
            SaslConfig::Plain { username, .. } => f
                .debug_struct("Plain")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            SaslConfig::PlainFile(path) => f.debug_tuple("PlainFile").field(path).finish(),
            SaslConfig::Callback { mechanism, .. } => f
                .debug_struct("Callback")
                .field("mechanism", mechanism)
                .finish_non_exhaustive(),
        }
    }
}

/// Where per-message debug traces go.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DebugSink {
    #[default]
    Off,
    Stdout,
    File(PathBuf),
}
