//! TLS configuration and certificate loading.
//!
//! # State Machine
//! ```text
//! NoCert ──(cert.pem + key.pem present)──▶ Loaded ──(rustls config)──▶ Configured ──▶ Listening
//!    │
//!    └──(either file missing)──▶ plaintext HTTP/1.1
//! ```
//!
//! # Design Decisions
//! - TLS 1.3 only, AEAD suites only
//! - ALPN advertises `h2` then `http/1.1`
//! - Client certificates are verified when presented, never required
//! - Present but unusable material is fatal; absent material is not

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustls::crypto::aws_lc_rs::{self, cipher_suite, kx_group};
use rustls::crypto::{CryptoProvider, SupportedKxGroup};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::WebPkiClientVerifier;
use rustls::{RootCertStore, ServerConfig, SupportedCipherSuite};
use thiserror::Error;

/// File name of the PEM certificate chain inside the certificates directory.
pub const CERT_FILE: &str = "cert.pem";
/// File name of the PEM private key inside the certificates directory.
pub const KEY_FILE: &str = "key.pem";

/// ALPN identifier for HTTP/2.
pub const ALPN_H2: &[u8] = b"h2";
/// ALPN identifier for HTTP/1.1.
pub const ALPN_HTTP11: &[u8] = b"http/1.1";

/// Unusable TLS material.
#[derive(Debug, Error)]
pub enum CertificateError {
    #[error("{0} file cannot be blank")]
    BlankPath(&'static str),

    #[error("{label} file not found {}", .path.display())]
    NotFound { label: &'static str, path: PathBuf },

    #[error("{label} file needs to specify a file in its path: {}", .path.display())]
    IsDirectory { label: &'static str, path: PathBuf },

    #[error("{label} file {} is empty", .path.display())]
    Empty { label: &'static str, path: PathBuf },

    #[error("failed to read {label} file {}: {source}", .path.display())]
    Read {
        label: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed PEM in {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no certificates found in {}", .0.display())]
    NoCertificates(PathBuf),

    #[error("no private key found in {}", .0.display())]
    NoPrivateKey(PathBuf),

    #[error("failed to build TLS configuration: {0}")]
    Config(#[from] rustls::Error),
}

/// Certificate chain and private key as read from disk.
///
/// Both buffers are non-empty; PEM well-formedness is checked when the
/// server configuration is built.
#[derive(Debug, Clone)]
pub struct TlsMaterial {
    cert_path: PathBuf,
    key_path: PathBuf,
    cert_pem: Vec<u8>,
    key_pem: Vec<u8>,
}

impl TlsMaterial {
    /// Look for `cert.pem` and `key.pem` in `dir`.
    ///
    /// Returns `None` unless both exist.
    pub fn locate(dir: &Path) -> Option<(PathBuf, PathBuf)> {
        let cert = dir.join(CERT_FILE);
        let key = dir.join(KEY_FILE);
        (cert.exists() && key.exists()).then_some((cert, key))
    }

    /// Read both files, rejecting missing, empty or directory paths.
    pub fn load(cert_path: &Path, key_path: &Path) -> Result<Self, CertificateError> {
        Ok(Self {
            cert_pem: read_pem_file(cert_path, "Cert")?,
            key_pem: read_pem_file(key_path, "Key")?,
            cert_path: cert_path.to_path_buf(),
            key_path: key_path.to_path_buf(),
        })
    }

    /// Build from in-memory PEM buffers.
    pub fn from_pem(cert_pem: impl Into<Vec<u8>>, key_pem: impl Into<Vec<u8>>) -> Self {
        Self {
            cert_path: PathBuf::from(CERT_FILE),
            key_path: PathBuf::from(KEY_FILE),
            cert_pem: cert_pem.into(),
            key_pem: key_pem.into(),
        }
    }

    pub fn cert_path(&self) -> &Path {
        &self.cert_path
    }

    pub fn key_path(&self) -> &Path {
        &self.key_path
    }

    /// Parse the certificate chain.
    pub fn certificates(&self) -> Result<Vec<CertificateDer<'static>>, CertificateError> {
        let certs = rustls_pemfile::certs(&mut self.cert_pem.as_slice())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| CertificateError::Malformed {
                path: self.cert_path.clone(),
                source,
            })?;
        if certs.is_empty() {
            return Err(CertificateError::NoCertificates(self.cert_path.clone()));
        }
        Ok(certs)
    }

    /// Parse the private key (PKCS#8, PKCS#1 or SEC1).
    pub fn private_key(&self) -> Result<PrivateKeyDer<'static>, CertificateError> {
        rustls_pemfile::private_key(&mut self.key_pem.as_slice())
            .map_err(|source| CertificateError::Malformed {
                path: self.key_path.clone(),
                source,
            })?
            .ok_or_else(|| CertificateError::NoPrivateKey(self.key_path.clone()))
    }
}

/// Read a PEM file, rejecting blank paths, directories and empty files.
pub fn read_pem_file(path: &Path, label: &'static str) -> Result<Vec<u8>, CertificateError> {
    if path.as_os_str().is_empty() || path.to_string_lossy().trim().is_empty() {
        return Err(CertificateError::BlankPath(label));
    }

    let metadata = fs::metadata(path).map_err(|_| CertificateError::NotFound {
        label,
        path: path.to_path_buf(),
    })?;
    if metadata.is_dir() {
        return Err(CertificateError::IsDirectory {
            label,
            path: path.to_path_buf(),
        });
    }

    let bytes = fs::read(path).map_err(|source| CertificateError::Read {
        label,
        path: path.to_path_buf(),
        source,
    })?;
    if bytes.is_empty() {
        return Err(CertificateError::Empty {
            label,
            path: path.to_path_buf(),
        });
    }
    Ok(bytes)
}

/// TLS 1.3 suites in preference order.
///
/// TLS 1.3 suites are independent of the certificate's key type, so ECDSA
/// and RSA certificates share this list; ECDSA is preferred at signature
/// scheme selection.
pub fn cipher_suites() -> Vec<SupportedCipherSuite> {
    vec![
        cipher_suite::TLS13_AES_256_GCM_SHA384,
        cipher_suite::TLS13_AES_128_GCM_SHA256,
        cipher_suite::TLS13_CHACHA20_POLY1305_SHA256,
    ]
}

/// Key exchange groups in preference order.
pub fn kx_groups() -> Vec<&'static dyn SupportedKxGroup> {
    vec![kx_group::SECP384R1, kx_group::SECP256R1, kx_group::X25519]
}

/// Crypto provider restricted to [`cipher_suites`] and [`kx_groups`].
pub fn crypto_provider() -> Arc<CryptoProvider> {
    Arc::new(CryptoProvider {
        cipher_suites: cipher_suites(),
        kx_groups: kx_groups(),
        ..aws_lc_rs::default_provider()
    })
}

/// Assemble the rustls server configuration for `material`.
pub fn build_server_config(material: &TlsMaterial) -> Result<ServerConfig, CertificateError> {
    let certs = material.certificates()?;
    let key = material.private_key()?;
    let provider = crypto_provider();

    // The served chain doubles as the client CA pool.
    let mut roots = RootCertStore::empty();
    roots.add_parsable_certificates(certs.iter().cloned());
    let verifier = WebPkiClientVerifier::builder_with_provider(Arc::new(roots), provider.clone())
        .allow_unauthenticated()
        .build()
        .unwrap_or_else(|err| {
            tracing::warn!(error = %err, "client certificate verification disabled");
            WebPkiClientVerifier::no_client_auth()
        });

    let mut config = ServerConfig::builder_with_provider(provider)
        .with_protocol_versions(&[&rustls::version::TLS13])?
        .with_client_cert_verifier(verifier)
        .with_single_cert(certs, key)?;
    config.alpn_protocols = vec![ALPN_H2.to_vec(), ALPN_HTTP11.to_vec()];

    Ok(config)
}

/// Run the bootstrap for `cert_dir`.
///
/// `Ok(None)` means no material was found and the caller should serve
/// plaintext. Material that exists but cannot be used is an error.
pub fn bootstrap(cert_dir: &Path) -> Result<Option<Arc<ServerConfig>>, CertificateError> {
    let Some((cert_path, key_path)) = TlsMaterial::locate(cert_dir) else {
        return Ok(None);
    };

    let material = TlsMaterial::load(&cert_path, &key_path)?;
    tracing::debug!(
        cert = %material.cert_path().display(),
        key = %material.key_path().display(),
        "TLS material loaded"
    );

    let config = build_server_config(&material)?;
    Ok(Some(Arc::new(config)))
}
