//! TCP/TLS transport for one connection.
//!
//! Owns stream setup: address-family pinning, connect timeout, TCP
//! keepalive, and the optional TLS upgrade. Reads and writes go through
//! the [`LineCodec`] framing.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{lookup_host, TcpStream};
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls;
use tokio_rustls::TlsConnector;
use tokio_util::codec::Framed;
use tracing::{debug, warn};

use crate::codec::LineCodec;
use crate::config::{Config, IpVersion};
use crate::error::{Result, SessionError};

#[allow(clippy::large_enum_variant)]
pub enum Transport {
    Tcp {
        framed: Framed<TcpStream, LineCodec>,
    },
    Tls {
        framed: Framed<TlsStream<TcpStream>, LineCodec>,
    },
}

impl Transport {
    /// Open a stream per the config: resolve (honoring any address
    /// family pin), connect within the connect timeout, then optionally
    /// upgrade to TLS.
    pub async fn connect(config: &Config) -> Result<Self> {
        let stream = tokio::time::timeout(config.connect_timeout(), open_stream(config))
            .await
            .map_err(|_| SessionError::ConnectTimeout(config.connect_timeout()))??;

        if let Err(e) = enable_keepalive(&stream) {
            warn!("failed to enable TCP keepalive: {}", e);
        }

        if config.tls {
            let tls = upgrade_tls(stream, config).await?;
            Ok(Self::Tls {
                framed: Framed::new(tls, LineCodec::new()),
            })
        } else {
            Ok(Self::Tcp {
                framed: Framed::new(stream, LineCodec::new()),
            })
        }
    }

    pub fn is_tls(&self) -> bool {
        matches!(self, Self::Tls { .. })
    }

    /// Next complete line, or `None` when the peer closed the stream.
    pub async fn read_line(&mut self) -> Result<Option<String>> {
        macro_rules! read_framed {
            ($framed:expr) => {
                match $framed.next().await {
                    Some(Ok(line)) => Ok(Some(line)),
                    Some(Err(e)) => Err(e),
                    None => Ok(None),
                }
            };
        }

        match self {
            Transport::Tcp { framed } => read_framed!(framed),
            Transport::Tls { framed } => read_framed!(framed),
        }
    }

    /// Write one line to the wire (CRLF appended by the codec).
    pub async fn write_line(&mut self, line: String) -> Result<()> {
        match self {
            Transport::Tcp { framed } => framed.send(line).await,
            Transport::Tls { framed } => framed.send(line).await,
        }
    }
}

/// Connect the raw TCP stream.
///
/// A literal IP address decides its own family. With a pin, the first
/// resolved address of that family is used; without one, the whole
/// `(host, port)` pair goes to the connector, which tries resolver
/// order.
async fn open_stream(config: &Config) -> Result<TcpStream> {
    if let Ok(ip) = config.network.parse::<IpAddr>() {
        let stream = TcpStream::connect(SocketAddr::new(ip, config.port)).await?;
        return Ok(stream);
    }

    match config.ip_version {
        None => Ok(TcpStream::connect((config.network.as_str(), config.port)).await?),
        Some(version) => {
            let wanted = |addr: &SocketAddr| match version {
                IpVersion::V4 => addr.is_ipv4(),
                IpVersion::V6 => addr.is_ipv6(),
            };
            let addr = lookup_host((config.network.as_str(), config.port))
                .await?
                .find(|addr| wanted(addr))
                .ok_or_else(|| {
                    std::io::Error::new(
                        std::io::ErrorKind::AddrNotAvailable,
                        format!(
                            "no {} address for {}",
                            match version {
                                IpVersion::V4 => "IPv4",
                                IpVersion::V6 => "IPv6",
                            },
                            config.network
                        ),
                    )
                })?;
            debug!(%addr, "pinned address family");
            Ok(TcpStream::connect(addr).await?)
        }
    }
}

fn enable_keepalive(stream: &TcpStream) -> std::io::Result<()> {
    use socket2::{SockRef, TcpKeepalive};
    use std::time::Duration;

    let sock = SockRef::from(stream);
    let keepalive = TcpKeepalive::new()
        .with_time(Duration::from_secs(120))
        .with_interval(Duration::from_secs(30));

    sock.set_tcp_keepalive(&keepalive)
}

async fn upgrade_tls(stream: TcpStream, config: &Config) -> Result<TlsStream<TcpStream>> {
    let tls_config = if config.tls_insecure {
        warn!("TLS certificate verification disabled");
        insecure_client_config()
    } else {
        default_client_config()
    };

    let connector = TlsConnector::from(Arc::new(tls_config));
    let server_name = rustls::pki_types::ServerName::try_from(config.network.clone())
        .map_err(|_| SessionError::InvalidServerName(config.network.clone()))?;

    let tls = connector.connect(server_name, stream).await?;
    Ok(tls)
}

fn default_client_config() -> rustls::ClientConfig {
    let root_store =
        rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth()
}

fn insecure_client_config() -> rustls::ClientConfig {
    rustls::ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(InsecureVerifier))
        .with_no_client_auth()
}

#[derive(Debug)]
struct InsecureVerifier;

impl rustls::client::danger::ServerCertVerifier for InsecureVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        rustls::crypto::aws_lc_rs::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}
