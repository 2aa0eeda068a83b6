use rcgen::{CertificateParams, DnType, KeyPair, RsaKeySize, PKCS_ECDSA_P256_SHA256, PKCS_RSA_SHA256};
use std::path::Path;

/// Self-signed certificate and its private key in PEM
pub(crate) struct PemPair {
  pub cert: String,
  pub key: String,
  pub cert_der: Vec<u8>,
}

fn self_signed(name: &str, key_pair: KeyPair) -> PemPair {
  let mut params = CertificateParams::new(vec![name.to_string()]).unwrap();
  params.distinguished_name.push(DnType::CommonName, name);
  let cert = params.self_signed(&key_pair).unwrap();
  PemPair {
    cert: cert.pem(),
    key: key_pair.serialize_pem(),
    cert_der: cert.der().to_vec(),
  }
}

pub(crate) fn generate_ecdsa(name: &str) -> PemPair {
  self_signed(name, KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256).unwrap())
}

pub(crate) fn generate_rsa(name: &str) -> PemPair {
  self_signed(name, KeyPair::generate_rsa_for(&PKCS_RSA_SHA256, RsaKeySize::_2048).unwrap())
}

pub(crate) fn write_pair(cert_path: &Path, key_path: &Path, pem: &PemPair) {
  std::fs::write(cert_path, &pem.cert).unwrap();
  std::fs::write(key_path, &pem.key).unwrap();
}
