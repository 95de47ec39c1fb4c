//! TLS for `wss://` listeners.

use pairlink_core::{PairError, PairResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_rustls::TlsAcceptor;

/// Build a TLS acceptor from PEM certificate chain and private key files.
pub fn acceptor(cert_path: &Path, key_path: &Path) -> PairResult<TlsAcceptor> {
    let cert_pem = std::fs::read(cert_path)
        .map_err(|e| PairError::Config(format!("cannot read cert {}: {e}", cert_path.display())))?;
    let key_pem = std::fs::read(key_path)
        .map_err(|e| PairError::Config(format!("cannot read key {}: {e}", key_path.display())))?;

    let certs = rustls_pemfile::certs(&mut cert_pem.as_slice())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| PairError::Config(format!("bad certificate PEM: {e}")))?;
    if certs.is_empty() {
        return Err(PairError::Config(format!(
            "no certificates in {}",
            cert_path.display()
        )));
    }
    let key = rustls_pemfile::private_key(&mut key_pem.as_slice())
        .map_err(|e| PairError::Config(format!("bad key PEM: {e}")))?
        .ok_or_else(|| PairError::Config(format!("no private key in {}", key_path.display())))?;

    // Pin the ring provider so the build does not depend on a process default.
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut config = rustls::ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| PairError::Config(format!("TLS setup failed: {e}")))?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| PairError::Config(format!("TLS certificate rejected: {e}")))?;
    config.alpn_protocols = vec![b"http/1.1".to_vec()];

    Ok(TlsAcceptor::from(Arc::new(config)))
}

/// Write a self-signed localhost certificate into `dir` for development.
pub fn generate_dev_cert(dir: &Path) -> PairResult<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(dir)?;
    let cert_path = dir.join("cert.pem");
    let key_path = dir.join("key.pem");

    let cert_err = |e: rcgen::Error| PairError::Other(format!("certificate generation failed: {e}"));
    let mut params = rcgen::CertificateParams::new(vec![
        "localhost".to_string(),
        "127.0.0.1".to_string(),
        "::1".to_string(),
    ])
    .map_err(cert_err)?;
    params
        .distinguished_name
        .push(rcgen::DnType::CommonName, "pairlink-server dev cert");
    let key_pair = rcgen::KeyPair::generate().map_err(cert_err)?;
    let cert = params.self_signed(&key_pair).map_err(cert_err)?;

    std::fs::write(&cert_path, cert.pem())?;
    std::fs::write(&key_path, key_pair.serialize_pem())?;
    Ok((cert_path, key_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("pairlink-tls-{name}-{}", std::process::id()))
    }

    #[test]
    fn generated_cert_builds_acceptor() {
        let dir = scratch_dir("ok");
        let (cert, key) = generate_dev_cert(&dir).unwrap();
        assert!(acceptor(&cert, &key).is_ok());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_files_are_config_errors() {
        let dir = scratch_dir("missing");
        let result = acceptor(&dir.join("cert.pem"), &dir.join("key.pem"));
        assert!(matches!(result, Err(PairError::Config(_))));
    }

    #[test]
    fn key_file_without_key_is_rejected() {
        let dir = scratch_dir("nokey");
        let (cert, _key) = generate_dev_cert(&dir).unwrap();
        // The certificate PEM holds no private key.
        let result = acceptor(&cert, &cert);
        assert!(matches!(result, Err(PairError::Config(_))));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
