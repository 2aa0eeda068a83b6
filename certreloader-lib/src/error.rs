use std::{fmt, path::PathBuf};
use thiserror::Error;

pub type CertReloadResult<T> = std::result::Result<T, CertReloadError>;

/// Which one of the two watched files an error is about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptoFileKind {
  /// Server certificate (chain) file
  Certificate,
  /// Private key file
  PrivateKey,
}

impl fmt::Display for CryptoFileKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      CryptoFileKind::Certificate => write!(f, "certificate"),
      CryptoFileKind::PrivateKey => write!(f, "private key"),
    }
  }
}

/// Describes things that can go wrong in the certificate reloader
#[derive(Debug, Error)]
pub enum CertReloadError {
  /// Error when reading the certificate or the private key file
  #[error("Unable to read the {kind} [{}]: {source}", path.display())]
  Io {
    kind: CryptoFileKind,
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  /// Error when the read contents do not form a valid certificate and key pair
  #[error("Invalid certificate and key pair: {0}")]
  KeyPair(#[from] KeyPairError),
  /// No crypto provider for rustls
  #[error("No default crypto provider")]
  NoDefaultCryptoProvider,
  /// Error when building a rustls config over the reloader
  #[error("TLS configuration error: {0}")]
  TlsConfig(#[from] rustls::Error),
  /// Watch period must be longer than zero and no longer than `MAX_CERTS_WATCH_PERIOD`
  #[error("Invalid watch period for the certificate reloader: must be in (0, 1 year]")]
  InvalidWatchPeriod,
  /// The reloader spawns its watcher onto the current tokio runtime
  #[error("Certificate reloader must be built within a tokio runtime")]
  NoAsyncRuntime,
}

impl CertReloadError {
  pub(crate) fn io(kind: CryptoFileKind, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    CertReloadError::Io {
      kind,
      path: path.into(),
      source,
    }
  }
}

/// Reasons why certificate and private key bytes are rejected
#[derive(Debug, Error)]
pub enum KeyPairError {
  #[error("Unable to parse the certificates: {0}")]
  MalformedCertificate(rustls::pki_types::pem::Error),
  #[error("No certificate found")]
  NoCertificate,
  #[error("Unable to parse the private key: {0}")]
  MalformedPrivateKey(rustls::pki_types::pem::Error),
  #[error("No private key found - Make sure that it is in PKCS#8, PKCS#1 or SEC1 PEM format")]
  NoPrivateKey,
  #[error("Unsupported private key: {0}")]
  UnsupportedPrivateKey(rustls::Error),
  #[error("Certificate does not match the private key: {0}")]
  KeyMismatch(rustls::Error),
}
