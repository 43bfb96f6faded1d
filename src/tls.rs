//! The TLS mode ladder a client pool dials through.
//!
//! Mode `"0"` means no wrap at all and is handled directly by the refill
//! loop; this module only covers modes `"1"` and `"2"` on the client side,
//! plus the server-side config an embedder supplies.

use std::io;
use std::path::Path;
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, ServerConfig, SignatureScheme};
use tokio::net::TcpStream;
use tokio_rustls::{TlsAcceptor, TlsConnector};

/// The three TLS modes a client pool can be configured with.
///
/// Any code other than `"0"`, `"1"`, `"2"` is accepted by [`TlsMode::parse`]
/// as [`TlsMode::None`] — a deliberate, documented fallthrough (see
/// `DESIGN.md`) rather than a panic or rejected config, so callers who want
/// strict validation should check `tls_code` themselves at config time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
    /// `"0"` — the connection is used exactly as the dialer returned it.
    None,
    /// `"1"` — TLS 1.3, certificate verification disabled.
    EncryptNoVerify,
    /// `"2"` — TLS 1.3, full verification against the configured hostname.
    EncryptVerify,
}

impl TlsMode {
    pub fn parse(code: &str) -> Self {
        match code {
            "1" => TlsMode::EncryptNoVerify,
            "2" => TlsMode::EncryptVerify,
            _ => TlsMode::None,
        }
    }
}

/// Disables server certificate verification entirely. Only reachable via
/// [`TlsMode::EncryptNoVerify`], which is mode `"1"` of the ladder — encrypt
/// the wire without authenticating the peer.
#[derive(Debug)]
struct NoVerifier(Arc<rustls::crypto::CryptoProvider>);

impl ServerCertVerifier for NoVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
        .map(|_| HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
        .map(|_| HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}

fn tls13_only_versions() -> &'static [&'static rustls::SupportedProtocolVersion] {
    &[&rustls::version::TLS13]
}

/// Build the `ClientConfig` for mode `"1"`: TLS 1.3, no verification.
pub fn no_verify_client_config() -> Arc<ClientConfig> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = ClientConfig::builder_with_protocol_versions(tls13_only_versions())
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(NoVerifier(provider)))
        .with_no_client_auth();
    Arc::new(config)
}

/// Build the `ClientConfig` for mode `"2"`: TLS 1.3, full verification
/// against the platform's webpki root store.
pub fn verifying_client_config() -> Arc<ClientConfig> {
    let roots = RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let config = ClientConfig::builder_with_protocol_versions(tls13_only_versions())
        .with_root_certificates(roots)
        .with_no_client_auth();
    Arc::new(config)
}

/// Wrap a dialed TCP stream as a TLS client per `mode`, handshaking against
/// `hostname` (only consulted for [`TlsMode::EncryptVerify`]).
///
/// Returns `Err` on handshake failure; the caller drops the connection and
/// moves on to the next dial attempt, it does not stop the refill loop.
pub async fn wrap_client(
    mode: TlsMode,
    hostname: &str,
    stream: TcpStream,
) -> io::Result<tokio_rustls::client::TlsStream<TcpStream>> {
    let config = match mode {
        TlsMode::EncryptNoVerify => no_verify_client_config(),
        TlsMode::EncryptVerify => verifying_client_config(),
        TlsMode::None => unreachable!("wrap_client is only called for modes 1 and 2"),
    };
    let connector = TlsConnector::from(config);
    let server_name = ServerName::try_from(hostname.to_string())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    connector.connect(server_name, stream).await
}

/// Server-side TLS config, built once and shared across the accept loop.
#[derive(Clone)]
pub struct ServerTlsConfig {
    acceptor: TlsAcceptor,
}

impl ServerTlsConfig {
    /// Load a certificate chain and private key from PEM files.
    pub fn from_pem_files(cert_path: &Path, key_path: &Path) -> io::Result<Self> {
        if !cert_path.exists() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("certificate file not found: {:?}", cert_path),
            ));
        }
        if !key_path.exists() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("private key file not found: {:?}", key_path),
            ));
        }

        let cert_file = std::fs::File::open(cert_path)?;
        let key_file = std::fs::File::open(key_path)?;

        let certs: Vec<CertificateDer<'static>> =
            rustls_pemfile::certs(&mut std::io::BufReader::new(cert_file))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let key = rustls_pemfile::private_key(&mut std::io::BufReader::new(key_file))?
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidData, "no private key found in file")
            })?;

        Self::from_certs_and_key(certs, key)
    }

    pub fn from_certs_and_key(
        certs: Vec<CertificateDer<'static>>,
        key: PrivateKeyDer<'static>,
    ) -> io::Result<Self> {
        let config = ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(certs, key)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok(Self {
            acceptor: TlsAcceptor::from(Arc::new(config)),
        })
    }

    /// Wrap an accepted TCP stream as a TLS server. Handshake failure is
    /// returned to the caller, which closes the socket and continues the
    /// accept loop rather than stopping it.
    pub async fn wrap(
        &self,
        stream: TcpStream,
    ) -> io::Result<tokio_rustls::server::TlsStream<TcpStream>> {
        self.acceptor.accept(stream).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_recognizes_known_codes() {
        assert_eq!(TlsMode::parse("0"), TlsMode::None);
        assert_eq!(TlsMode::parse("1"), TlsMode::EncryptNoVerify);
        assert_eq!(TlsMode::parse("2"), TlsMode::EncryptVerify);
    }

    #[test]
    fn parse_falls_through_unknown_codes_to_none() {
        assert_eq!(TlsMode::parse("3"), TlsMode::None);
        assert_eq!(TlsMode::parse(""), TlsMode::None);
        assert_eq!(TlsMode::parse("tls"), TlsMode::None);
    }
}
