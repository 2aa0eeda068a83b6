use crate::{
  error::*,
  fingerprint::{Fingerprint, FingerprintedBytes},
  log::*,
};
use async_trait::async_trait;
use derive_builder::Builder;
use std::path::{Path, PathBuf};

/* ------------------------------------------------ */
/// Raw certificate and private key contents read at once, each with its fingerprint
#[derive(Debug, Clone)]
pub struct RawCertKey {
  pub cert: FingerprintedBytes,
  pub key: FingerprintedBytes,
}

impl RawCertKey {
  /// Fingerprint pair (certificate, private key)
  pub fn fingerprints(&self) -> (Fingerprint, Fingerprint) {
    (self.cert.fingerprint(), self.key.fingerprint())
  }
}

/* ------------------------------------------------ */
#[async_trait]
// Trait to read a certificate and its key anywhere from KVS, file, sqlite, etc.
pub trait CryptoSource {
  /// read crypto materials from source
  async fn read(&self) -> CertReloadResult<RawCertKey>;

  /// Short description of where the materials come from, used in logs
  fn describe(&self) -> String;

  /// Certificate and private key paths, for sources backed by files
  fn watched_paths(&self) -> Option<(&Path, &Path)> {
    None
  }
}

/* ------------------------------------------------ */
#[derive(Builder, Debug, Clone)]
#[builder(build_fn(validate = "Self::validate"))]
/// Crypto-related file reader implementing `CryptoSource` trait
pub struct CryptoFileSource {
  #[builder(setter(custom))]
  /// Absolute path to the PEM certificate (chain)
  pub tls_cert_path: PathBuf,

  #[builder(setter(custom))]
  /// Absolute path to the PEM private key
  pub tls_cert_key_path: PathBuf,
}

impl CryptoFileSourceBuilder {
  pub fn tls_cert_path<T: AsRef<Path>>(&mut self, v: T) -> &mut Self {
    self.tls_cert_path = Some(v.as_ref().to_path_buf());
    self
  }
  pub fn tls_cert_key_path<T: AsRef<Path>>(&mut self, v: T) -> &mut Self {
    self.tls_cert_key_path = Some(v.as_ref().to_path_buf());
    self
  }
  fn validate(&self) -> Result<(), String> {
    let is_empty = |p: &Option<PathBuf>| p.as_ref().is_some_and(|p| p.as_os_str().is_empty());
    if is_empty(&self.tls_cert_path) || is_empty(&self.tls_cert_key_path) {
      return Err("Empty path is given for the certificate or the private key".to_string());
    }
    Ok(())
  }
}

impl CryptoFileSource {
  /// Resolve both paths to absolute form. Paths are not required to exist at this point.
  pub(crate) fn to_absolute(&self) -> CertReloadResult<Self> {
    let tls_cert_path = std::path::absolute(&self.tls_cert_path)
      .map_err(|e| CertReloadError::io(CryptoFileKind::Certificate, &self.tls_cert_path, e))?;
    let tls_cert_key_path = std::path::absolute(&self.tls_cert_key_path)
      .map_err(|e| CertReloadError::io(CryptoFileKind::PrivateKey, &self.tls_cert_key_path, e))?;
    Ok(Self {
      tls_cert_path,
      tls_cert_key_path,
    })
  }
}

/* ------------------------------------------------ */
#[async_trait]
impl CryptoSource for CryptoFileSource {
  /// read crypto materials from source
  async fn read(&self) -> CertReloadResult<RawCertKey> {
    debug!("Read TLS server certificate and private key");
    let cert = read_file(&self.tls_cert_path, CryptoFileKind::Certificate).await?;
    let key = read_file(&self.tls_cert_key_path, CryptoFileKind::PrivateKey).await?;
    Ok(RawCertKey { cert, key })
  }

  fn describe(&self) -> String {
    format!(
      "cert: {}, key: {}",
      self.tls_cert_path.display(),
      self.tls_cert_key_path.display()
    )
  }

  fn watched_paths(&self) -> Option<(&Path, &Path)> {
    Some((&self.tls_cert_path, &self.tls_cert_key_path))
  }
}

/// Read whole file contents and fingerprint them
async fn read_file(path: &Path, kind: CryptoFileKind) -> CertReloadResult<FingerprintedBytes> {
  let bytes = tokio::fs::read(path)
    .await
    .map_err(|e| CertReloadError::io(kind, path, e))?;
  Ok(FingerprintedBytes::new(bytes))
}

/* ------------------------------------------------ */
