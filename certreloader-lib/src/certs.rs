use crate::{crypto_source::RawCertKey, error::*, fingerprint::Fingerprint};
use rustls::{
  crypto::CryptoProvider,
  pki_types::{pem::PemObject, CertificateDer, PrivateKeyDer},
  sign::CertifiedKey,
};
use std::sync::Arc;
use x509_parser::prelude::*;

/* ------------------------------------------------ */
/// Parse PEM certificate chain and private key and bind them into a rustls `CertifiedKey`.
/// Fails if either is malformed or if the leaf certificate's public key is not the one of the private key.
pub fn parse_certified_key(raw: &RawCertKey, provider: &CryptoProvider) -> Result<CertifiedKey, KeyPairError> {
  let certs = CertificateDer::pem_slice_iter(raw.cert.as_bytes())
    .collect::<Result<Vec<_>, _>>()
    .map_err(KeyPairError::MalformedCertificate)?;
  if certs.is_empty() {
    return Err(KeyPairError::NoCertificate);
  }

  let key = PrivateKeyDer::from_pem_slice(raw.key.as_bytes()).map_err(|e| match e {
    rustls::pki_types::pem::Error::NoItemsFound => KeyPairError::NoPrivateKey,
    e => KeyPairError::MalformedPrivateKey(e),
  })?;
  let signing_key = provider
    .key_provider
    .load_private_key(key)
    .map_err(KeyPairError::UnsupportedPrivateKey)?;

  let certified_key = CertifiedKey::new(certs, signing_key);
  certified_key.keys_match().map_err(KeyPairError::KeyMismatch)?;
  Ok(certified_key)
}

/* ------------------------------------------------ */
/// Human readable summary of the published certificate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertSummary {
  /// Subject of the leaf certificate
  pub subject: String,
  /// Expiry of the leaf certificate
  pub not_after: String,
  /// Number of certificates in the chain
  pub chain_len: usize,
  pub cert_fingerprint: Fingerprint,
  pub key_fingerprint: Fingerprint,
}

impl CertSummary {
  pub(crate) fn new(certified_key: &CertifiedKey, cert_fingerprint: Fingerprint, key_fingerprint: Fingerprint) -> Self {
    let parsed = certified_key
      .end_entity_cert()
      .ok()
      .and_then(|der| parse_x509_certificate(der).ok().map(|(_, cert)| cert));
    let (subject, not_after) = match parsed {
      Some(cert) => (cert.subject().to_string(), cert.validity().not_after.to_string()),
      None => ("<unknown>".to_string(), "<unknown>".to_string()),
    };
    Self {
      subject,
      not_after,
      chain_len: certified_key.cert.len(),
      cert_fingerprint,
      key_fingerprint,
    }
  }
}

/* ------------------------------------------------ */
/// Immutable snapshot of everything a reload publishes at once
#[derive(Debug)]
pub(crate) struct PublishedCrypto {
  pub(crate) certified_key: Arc<CertifiedKey>,
  pub(crate) summary: CertSummary,
}

impl PublishedCrypto {
  pub(crate) fn new(certified_key: CertifiedKey, cert_fingerprint: Fingerprint, key_fingerprint: Fingerprint) -> Self {
    let summary = CertSummary::new(&certified_key, cert_fingerprint, key_fingerprint);
    Self {
      certified_key: Arc::new(certified_key),
      summary,
    }
  }

  /// Whether the given fingerprints equal the accepted ones
  pub(crate) fn is_same_source(&self, (cert_fingerprint, key_fingerprint): (Fingerprint, Fingerprint)) -> bool {
    self.summary.cert_fingerprint == cert_fingerprint && self.summary.key_fingerprint == key_fingerprint
  }
}

/* ------------------------------------------------ */
