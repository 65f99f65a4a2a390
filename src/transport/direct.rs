// MIT License - Copyright (c) 2021 TJForc
// Direct TCP and TLS transports to the M1XEP

use std::sync::Arc;
use std::time::Duration;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, SignatureScheme};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, error, info};

use crate::config::{M1Config, TlsVersion};
use crate::error::{ElkError, Result};
use crate::transport::{BoxedStream, Connector};

/// Plain TCP connection (M1XEP non-secure port, usually 2101).
#[derive(Debug, Clone)]
pub struct PlainConnector {
    address: String,
    timeout: Duration,
}

impl PlainConnector {
    pub fn new(address: impl Into<String>, timeout: Duration) -> Self {
        Self {
            address: address.into(),
            timeout,
        }
    }
}

async fn tcp_connect(address: &str, limit: Duration) -> Result<TcpStream> {
    info!("Connecting to panel at {}", address);
    let stream = timeout(limit, TcpStream::connect(address))
        .await
        .map_err(|_| {
            error!("TCP connect to {} timed out", address);
            ElkError::ConnectionTimeout {
                address: address.to_string(),
            }
        })?
        .map_err(|e| {
            error!("TCP connect failed: {}", e);
            ElkError::Io(e)
        })?;
    stream.set_nodelay(true)?;
    debug!("TCP socket connected");
    Ok(stream)
}

impl Connector for PlainConnector {
    async fn open(&self) -> Result<BoxedStream> {
        let stream = tcp_connect(&self.address, self.timeout).await?;
        Ok(Box::new(stream))
    }

    fn describe(&self) -> String {
        format!("tcp://{}", self.address)
    }
}

/// TLS connection (M1XEP secure port, usually 2601).
#[derive(Clone)]
pub struct TlsConnector {
    address: String,
    timeout: Duration,
    version: TlsVersion,
    connector: tokio_rustls::TlsConnector,
}

impl TlsConnector {
    pub fn new(address: impl Into<String>, timeout: Duration, version: TlsVersion) -> Result<Self> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let config = rustls::ClientConfig::builder_with_provider(provider.clone())
            .with_protocol_versions(&[&rustls::version::TLS12])
            .map_err(|e| ElkError::Tls(e.to_string()))?
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(PanelCertVerifier(provider)))
            .with_no_client_auth();
        Ok(Self {
            address: address.into(),
            timeout,
            version,
            connector: tokio_rustls::TlsConnector::from(Arc::new(config)),
        })
    }

    fn server_name(&self) -> Result<ServerName<'static>> {
        let host = self
            .address
            .rsplit_once(':')
            .map_or(self.address.as_str(), |(host, _)| host);
        let host = host.trim_start_matches('[').trim_end_matches(']');
        ServerName::try_from(host.to_string())
            .map_err(|e| ElkError::Tls(format!("invalid server name {host}: {e}")))
    }
}

impl Connector for TlsConnector {
    async fn open(&self) -> Result<BoxedStream> {
        let tcp = tcp_connect(&self.address, self.timeout).await?;
        let name = self.server_name()?;
        let stream = timeout(self.timeout, self.connector.connect(name, tcp))
            .await
            .map_err(|_| ElkError::ConnectionTimeout {
                address: self.address.clone(),
            })?
            .map_err(|e| {
                error!("TLS handshake failed: {}", e);
                ElkError::Tls(e.to_string())
            })?;
        debug!("TLS session established ({})", self.version);
        Ok(Box::new(stream))
    }

    fn describe(&self) -> String {
        format!("tls://{}", self.address)
    }
}

/// Build the connector selected by the configuration.
pub enum PanelConnector {
    Plain(PlainConnector),
    Tls(TlsConnector),
}

impl PanelConnector {
    pub fn from_config(config: &M1Config) -> Result<Self> {
        let timeout = config.timeout();
        Ok(match config.tls_version()? {
            None => Self::Plain(PlainConnector::new(&config.address, timeout)),
            Some(version) => Self::Tls(TlsConnector::new(&config.address, timeout, version)?),
        })
    }
}

impl Connector for PanelConnector {
    async fn open(&self) -> Result<BoxedStream> {
        match self {
            Self::Plain(c) => c.open().await,
            Self::Tls(c) => c.open().await,
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Plain(c) => c.describe(),
            Self::Tls(c) => c.describe(),
        }
    }
}

/// M1XEP modules ship self-signed certificates, so the chain is not
/// verified. Handshake signatures are still checked.
#[derive(Debug)]
struct PanelCertVerifier(Arc<CryptoProvider>);

impl ServerCertVerifier for PanelCertVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_name_from_address() {
        let c = TlsConnector::new("192.168.1.20:2601", Duration::from_secs(1), TlsVersion::V1_2)
            .unwrap();
        assert!(c.server_name().is_ok());
        assert_eq!(c.describe(), "tls://192.168.1.20:2601");

        let c = TlsConnector::new("m1xep.local:2601", Duration::from_secs(1), TlsVersion::V1_2)
            .unwrap();
        assert!(c.server_name().is_ok());
    }

    #[tokio::test]
    async fn test_plain_connect_refused() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);
        let c = PlainConnector::new(address, Duration::from_secs(1));
        let err = c.open().await.err().expect("connect should fail");
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_plain_connect_accepts() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let accept = tokio::spawn(async move { listener.accept().await.map(|_| ()) });
        let c = PlainConnector::new(address, Duration::from_secs(1));
        assert!(c.open().await.is_ok());
        accept.await.unwrap().unwrap();
    }
}
