//! A [`Checker`] implementation that performs real TLS handshakes with
//! rustls, trusting exactly the suite's test root certificate.

use crate::error::Error;
use crate::executor::Checker;
use async_trait::async_trait;
use rustls::{ClientConfig, OwnedTrustAnchor, RootCertStore, ServerName};
use std::convert::TryFrom;
use std::io::ErrorKind;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;

const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Probes endpoints with a rustls client handshake.
///
/// The connector trusts only the DER-encoded root passed at construction,
/// so validation outcomes depend solely on the per-test certificate chain
/// served by the endpoint. A completed handshake resolves to `true`; a
/// handshake rejected during certificate validation resolves to `false`.
/// TCP connection failures and timeouts are infrastructure errors and
/// abort the run.
pub struct RustlsChecker {
    connector: TlsConnector,
    timeout: Duration,
}

impl RustlsChecker {
    /// Builds a checker trusting exactly the given DER-encoded root
    /// certificate.
    pub fn new(root_der: &[u8]) -> Result<Self, Error> {
        let mut root_store = RootCertStore::empty();
        let (added, ignored) = root_store.add_parsable_certificates(&[root_der.to_vec()]);
        if added != 1 || ignored != 0 {
            return Err(Error::Probe(
                "test root certificate could not be parsed".into(),
            ));
        }
        let config = ClientConfig::builder()
            .with_safe_defaults()
            .with_root_certificates(root_store)
            .with_no_client_auth();
        Ok(Self {
            connector: TlsConnector::from(Arc::new(config)),
            timeout: DEFAULT_PROBE_TIMEOUT,
        })
    }

    /// Builds a checker trusting the given webpki trust anchors instead of
    /// a DER certificate.
    pub fn with_trust_anchors(roots: impl IntoIterator<Item = OwnedTrustAnchor>) -> Self {
        let mut root_store = RootCertStore::empty();
        root_store.add_server_trust_anchors(roots.into_iter());
        let config = ClientConfig::builder()
            .with_safe_defaults()
            .with_root_certificates(root_store)
            .with_no_client_auth();
        Self {
            connector: TlsConnector::from(Arc::new(config)),
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Overrides the per-probe timeout. A probe that exceeds it is an
    /// infrastructure error, not a rejection.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Checker for RustlsChecker {
    async fn check(&mut self, host: &str, port: u16) -> Result<bool, Error> {
        let server_name = ServerName::try_from(host)
            .map_err(|_| Error::Probe(format!("invalid probe host {host:?}")))?;

        let tcp = tokio::time::timeout(self.timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| Error::Probe(format!("timed out connecting to {host}:{port}")))?
            .map_err(|err| Error::Probe(format!("failed to connect to {host}:{port}: {err}")))?;

        let handshake = tokio::time::timeout(self.timeout, self.connector.connect(server_name, tcp))
            .await
            .map_err(|_| Error::Probe(format!("TLS handshake with {host}:{port} timed out")))?;

        match handshake {
            Ok(_) => Ok(true),
            // rustls surfaces certificate validation failures as
            // `InvalidData`; the server aborting the handshake after its own
            // policy check shows up as a reset or truncated stream. Both are
            // rejections of this test's certificate, not harness failures.
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::InvalidData
                        | ErrorKind::ConnectionReset
                        | ErrorKind::ConnectionAborted
                        | ErrorKind::UnexpectedEof
                ) =>
            {
                log::debug!("validation rejected for {host}:{port}: {err}");
                Ok(false)
            }
            Err(err) => Err(Error::Probe(format!(
                "TLS handshake with {host}:{port} failed: {err}"
            ))),
        }
    }
}
