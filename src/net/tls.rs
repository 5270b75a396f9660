//! TLS configuration and certificate loading.
//!
//! The listener only speaks TLS 1.2 and 1.3, advertises `h2` ahead of
//! `http/1.1` via ALPN, and restricts key exchange to X25519 and P-256.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum_server::tls_rustls::RustlsConfig;
use rustls::crypto::{aws_lc_rs, CryptoProvider};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::ServerConfig;
use thiserror::Error;

/// ALPN protocols in preference order.
pub const ALPN_PROTOCOLS: [&[u8]; 2] = [b"h2", b"http/1.1"];

/// Errors raised while preparing the listener's TLS configuration.
#[derive(Debug, Error)]
pub enum TlsError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no certificates found in PEM data")]
    NoCertificates,

    #[error("no private key found in PEM data")]
    NoPrivateKey,

    #[error("invalid PEM data: {0}")]
    Pem(std::io::Error),

    #[error("TLS configuration rejected: {0}")]
    Rustls(#[from] rustls::Error),
}

/// Crypto provider with key exchange limited to X25519 and P-256.
fn crypto_provider() -> CryptoProvider {
    CryptoProvider {
        kx_groups: vec![aws_lc_rs::kx_group::X25519, aws_lc_rs::kx_group::SECP256R1],
        ..aws_lc_rs::default_provider()
    }
}

/// Build the listener's rustls configuration from PEM-encoded material.
pub fn server_config_from_pem(cert_pem: &[u8], key_pem: &[u8]) -> Result<ServerConfig, TlsError> {
    let certs: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut &cert_pem[..])
        .collect::<Result<_, _>>()
        .map_err(TlsError::Pem)?;
    if certs.is_empty() {
        return Err(TlsError::NoCertificates);
    }

    let key: PrivateKeyDer<'static> = rustls_pemfile::private_key(&mut &key_pem[..])
        .map_err(TlsError::Pem)?
        .ok_or(TlsError::NoPrivateKey)?;

    let mut config = ServerConfig::builder_with_provider(Arc::new(crypto_provider()))
        .with_protocol_versions(&[&rustls::version::TLS13, &rustls::version::TLS12])?
        .with_no_client_auth()
        .with_single_cert(certs, key)?;
    config.alpn_protocols = ALPN_PROTOCOLS.iter().map(|p| p.to_vec()).collect();

    Ok(config)
}

/// Load TLS configuration from certificate and key files.
pub async fn load_tls_config(cert_path: &Path, key_path: &Path) -> Result<RustlsConfig, TlsError> {
    let cert_pem = read_pem(cert_path).await?;
    let key_pem = read_pem(key_path).await?;

    let config = server_config_from_pem(&cert_pem, &key_pem)?;
    tracing::debug!(cert = ?cert_path, key = ?key_path, "TLS material loaded");

    Ok(RustlsConfig::from_config(Arc::new(config)))
}

async fn read_pem(path: &Path) -> Result<Vec<u8>, TlsError> {
    tokio::fs::read(path).await.map_err(|source| TlsError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn self_signed() -> (String, String) {
        let certified = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        (certified.cert.pem(), certified.key_pair.serialize_pem())
    }

    #[test]
    fn advertises_h2_then_http11() {
        let (cert, key) = self_signed();
        let config = server_config_from_pem(cert.as_bytes(), key.as_bytes()).unwrap();

        assert_eq!(config.alpn_protocols, vec![b"h2".to_vec(), b"http/1.1".to_vec()]);
    }

    #[test]
    fn restricts_key_exchange_groups() {
        let provider = crypto_provider();
        let names: Vec<_> = provider.kx_groups.iter().map(|g| g.name()).collect();

        assert_eq!(
            names,
            vec![rustls::NamedGroup::X25519, rustls::NamedGroup::secp256r1]
        );
    }

    #[test]
    fn rejects_missing_key() {
        let (cert, _) = self_signed();
        let err = server_config_from_pem(cert.as_bytes(), b"").unwrap_err();
        assert!(matches!(err, TlsError::NoPrivateKey));
    }

    #[test]
    fn rejects_missing_certificate() {
        let (_, key) = self_signed();
        let err = server_config_from_pem(b"garbage", key.as_bytes()).unwrap_err();
        assert!(matches!(err, TlsError::NoCertificates));
    }

    #[tokio::test]
    async fn missing_files_are_reported_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let cert_path = dir.path().join("cert.pem");
        let key_path = dir.path().join("key.pem");

        let err = load_tls_config(&cert_path, &key_path).await.unwrap_err();
        match err {
            TlsError::Io { path, .. } => assert_eq!(path, cert_path),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn loads_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let (cert, key) = self_signed();
        let cert_path = dir.path().join("cert.pem");
        let key_path = dir.path().join("key.pem");
        std::fs::write(&cert_path, cert).unwrap();
        std::fs::write(&key_path, key).unwrap();

        assert!(load_tls_config(&cert_path, &key_path).await.is_ok());
    }
}
