use rcgen::{CertificateParams, KeyPair, RsaKeySize, PKCS_RSA_SHA256};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct PemPair {
  pub cert: String,
  pub key: String,
  pub cert_der: Vec<u8>,
  pub public_key_der: Vec<u8>,
}

/// Self-signed certificate over a fresh 2048-bit RSA key
pub fn generate_rsa_pair(name: &str) -> PemPair {
  let key_pair = KeyPair::generate_rsa_for(&PKCS_RSA_SHA256, RsaKeySize::_2048).unwrap();
  let cert = CertificateParams::new(vec![name.to_string()])
    .unwrap()
    .self_signed(&key_pair)
    .unwrap();
  PemPair {
    cert: cert.pem(),
    key: key_pair.serialize_pem(),
    cert_der: cert.der().to_vec(),
    public_key_der: key_pair.public_key_der(),
  }
}

pub struct CertDir {
  _dir: TempDir,
  pub cert: PathBuf,
  pub key: PathBuf,
}

impl CertDir {
  pub fn new() -> Self {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let cert = dir.path().join("fullchain.pem");
    let key = dir.path().join("privkey.pem");
    Self { _dir: dir, cert, key }
  }

  pub fn write(&self, pem: &PemPair) {
    write_file(&self.cert, &pem.cert);
    write_file(&self.key, &pem.key);
  }
}

fn write_file(path: &Path, contents: &str) {
  std::fs::write(path, contents).unwrap();
}
