mod certs;
mod constants;
mod crypto_source;
mod error;
mod fingerprint;
mod reloader_service;
mod server_crypto;

#[cfg(test)]
mod test_utils;

#[allow(unused_imports)]
mod log {
  pub(super) use tracing::{debug, error, info, warn};
}

use crate::log::*;
use rustls::crypto::CryptoProvider;
use std::sync::Arc;

/* ------------------------------------------------ */
pub use crate::{
  certs::{parse_certified_key, CertSummary},
  constants::{DEFAULT_CERTS_WATCH_PERIOD, MAX_CERTS_WATCH_PERIOD},
  crypto_source::{CryptoFileSource, CryptoFileSourceBuilder, CryptoFileSourceBuilderError, CryptoSource, RawCertKey},
  error::{CertReloadError, CertReloadResult, CryptoFileKind, KeyPairError},
  fingerprint::{Fingerprint, FingerprintedBytes},
  reloader_service::{CertReloader, ReloadOutcome},
  server_crypto::build_server_config,
};

pub mod reexports {
  pub use rustls::{sign::CertifiedKey, ServerConfig};
}

/* ------------------------------------------------ */
/// Crypto provider used to load private keys and build server configs.
/// Installs aws_lc_rs as the process default if nothing is installed yet.
pub(crate) fn default_crypto_provider() -> CertReloadResult<Arc<CryptoProvider>> {
  if CryptoProvider::get_default().is_none() {
    debug!("Install aws_lc_rs as default crypto provider for rustls");
    // another thread may have won the race
    let _ = CryptoProvider::install_default(rustls::crypto::aws_lc_rs::default_provider());
  }
  CryptoProvider::get_default()
    .cloned()
    .ok_or(CertReloadError::NoDefaultCryptoProvider)
}
