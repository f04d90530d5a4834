//! Transport security for the secured acceptor variants
//!
//! Credentials arrive as PEM file paths at acceptor construction. Loading
//! happens at bind time, so a bad pair fails the acceptor before its
//! accept loop starts.

use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;

use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tokio_rustls::rustls::ServerConfig;
use tokio_rustls::TlsAcceptor;

use crate::error::{Error, Result};

/// Certificate/key file pair for a secured acceptor.
#[derive(Debug, Clone)]
pub struct TlsIdentity {
    pub cert_file: String,
    pub key_file: String,
}

/// Applies the credential-path count rule: zero paths means a plain
/// transport, exactly two means TLS (certificate file, then key file).
pub(crate) fn identity_from_paths(certs: &[String]) -> Result<Option<TlsIdentity>> {
    match certs {
        [] => Ok(None),
        [cert, key] => Ok(Some(TlsIdentity {
            cert_file: cert.clone(),
            key_file: key.clone(),
        })),
        _ => Err(Error::InvalidCertificates),
    }
}

impl TlsIdentity {
    /// Builds the handshake acceptor. Any load or assembly failure is
    /// fatal to the bind phase of the owning acceptor.
    pub(crate) fn build_acceptor(&self) -> Result<TlsAcceptor> {
        let certs = load_certs(&self.cert_file)?;
        let key = load_private_key(&self.key_file)?;

        let server_config = ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(certs, key)
            .map_err(|e| Error::Tls(format!("invalid certificate/key pair: {}", e)))?;

        Ok(TlsAcceptor::from(Arc::new(server_config)))
    }
}

fn load_certs(path: &str) -> Result<Vec<CertificateDer<'static>>> {
    let file = File::open(path)
        .map_err(|e| Error::Tls(format!("failed to open certificate file {}: {}", path, e)))?;
    let mut reader = BufReader::new(file);
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::Tls(format!("failed to parse certificates: {}", e)))?;
    Ok(certs)
}

fn load_private_key(path: &str) -> Result<PrivateKeyDer<'static>> {
    let file = File::open(path)
        .map_err(|e| Error::Tls(format!("failed to open key file {}: {}", path, e)))?;
    let mut reader = BufReader::new(file);

    let items = rustls_pemfile::read_all(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::Tls(format!("failed to parse private key: {}", e)))?;

    for item in items {
        match item {
            rustls_pemfile::Item::Pkcs8Key(key) => return Ok(PrivateKeyDer::Pkcs8(key)),
            rustls_pemfile::Item::Pkcs1Key(key) => return Ok(PrivateKeyDer::Pkcs1(key)),
            rustls_pemfile::Item::Sec1Key(key) => return Ok(PrivateKeyDer::Sec1(key)),
            _ => continue,
        }
    }

    Err(Error::Tls(format!("no private key found in {}", path)))
}

/// Writes a fresh self-signed certificate/key pair to the temp directory
/// and returns their paths plus the DER certificate for client trust.
#[cfg(test)]
pub(crate) fn write_self_signed_pair(tag: &str) -> (String, String, CertificateDer<'static>) {
    let cert = rcgen::generate_simple_self_signed(vec!["localhost".to_string()])
        .expect("generate self-signed certificate");
    let dir = std::env::temp_dir();
    let cert_path = dir.join(format!("netgate-{}-{}.crt", tag, std::process::id()));
    let key_path = dir.join(format!("netgate-{}-{}.key", tag, std::process::id()));
    std::fs::write(&cert_path, cert.cert.pem()).expect("write certificate file");
    std::fs::write(&key_path, cert.signing_key.serialize_pem()).expect("write key file");
    (
        cert_path.to_string_lossy().into_owned(),
        key_path.to_string_lossy().into_owned(),
        cert.cert.der().clone(),
    )
}
