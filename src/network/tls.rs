//! TLS connector assembly for broker connections.
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::io;
use std::sync::Arc;

use rustls_pemfile::{certs, pkcs8_private_keys};
use rustls_pki_types::{CertificateDer, PrivateKeyDer};
use tokio_rustls::{rustls, TlsConnector};

use crate::config::{TlsConfig, TlsOptions};
use crate::error::{Error, Result};

/// Build the connector described by the config.
///
/// [`TlsConfig::On`] trusts the webpki roots with no client identity;
/// [`TlsConfig::Custom`] may swap the roots for a CA bundle and attach
/// a client certificate for mutual TLS.
pub(crate) fn connector(config: &TlsConfig) -> Result<TlsConnector> {
    let options = match config {
        TlsConfig::Off => {
            return Err(Error::FailedToUpgradeToTls(
                "TLS requested on a plaintext connection".into(),
            ))
        }
        TlsConfig::On => TlsOptions::default(),
        TlsConfig::Custom(options) => options.clone(),
    };

    let mut root_cert_store = rustls::RootCertStore::empty();
    if let Some(cafile) = &options.cafile {
        for cert in load_certs(cafile)? {
            root_cert_store
                .add(cert)
                .map_err(|e| Error::FailedToUpgradeToTls(format!("bad CA certificate: {e}")))?;
        }
    } else {
        root_cert_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    }

    let builder = rustls::ClientConfig::builder().with_root_certificates(root_cert_store);

    let tls_config = match (&options.cert, &options.key) {
        (Some(cert), Some(key)) => {
            let certs = load_certs(cert)?;
            let key = load_key(key)?;
            builder
                .with_client_auth_cert(certs, key)
                .map_err(|e| Error::FailedToUpgradeToTls(format!("bad client identity: {e}")))?
        }
        (None, None) => builder.with_no_client_auth(),
        _ => {
            return Err(Error::ConfigError(
                "client TLS identity needs both a cert and a key".into(),
            ))
        }
    };

    Ok(TlsConnector::from(Arc::new(tls_config)))
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let file = File::open(path).map_err(|e| open_error(path, e))?;
    certs(&mut BufReader::new(file))
        .collect::<io::Result<Vec<_>>>()
        .map_err(|e| Error::FailedToUpgradeToTls(format!("bad PEM in {}: {e}", path.display())))
}

fn load_key(path: &Path) -> Result<PrivateKeyDer<'static>> {
    let file = File::open(path).map_err(|e| open_error(path, e))?;
    pkcs8_private_keys(&mut BufReader::new(file))
        .next()
        .ok_or_else(|| {
            Error::FailedToUpgradeToTls(format!("no PKCS#8 key in {}", path.display()))
        })?
        .map(Into::into)
        .map_err(|e| Error::FailedToUpgradeToTls(format!("bad key in {}: {e}", path.display())))
}

fn open_error(path: &Path, e: io::Error) -> Error {
    Error::ConfigError(format!("unable to open {}: {e}", path.display()))
}
