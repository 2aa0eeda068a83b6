use super::parse::{Opts, ServiceConfig};
use crate::{
  constants::*,
  error::{anyhow, ensure, Context},
};
use certreloader_lib::MAX_CERTS_WATCH_PERIOD;
use serde::Deserialize;
use std::{fs, net::SocketAddr, path::PathBuf, time::Duration};

#[derive(Deserialize, Debug, Default, PartialEq, Eq, Clone)]
pub struct ConfigToml {
  pub listen_address: Option<String>,
  pub listen_port_tls: Option<u16>,
  pub tls_cert_path: Option<String>,
  pub tls_cert_key_path: Option<String>,
  /// Watch period of the certificate and key files in milliseconds
  pub certs_watch_period_ms: Option<u64>,
}

impl ConfigToml {
  pub fn new(config_file: &str) -> std::result::Result<Self, anyhow::Error> {
    let config_str = fs::read_to_string(config_file).with_context(|| format!("Failed to read {config_file}"))?;

    toml::from_str(&config_str).map_err(|e| anyhow!(e))
  }

  /// Values given on the command line take precedence over the file
  pub fn override_with(mut self, opts: &Opts) -> Self {
    if let Some(v) = &opts.tls_cert_path {
      self.tls_cert_path = Some(v.clone());
    }
    if let Some(v) = &opts.tls_cert_key_path {
      self.tls_cert_key_path = Some(v.clone());
    }
    if let Some(v) = &opts.listen_address {
      self.listen_address = Some(v.clone());
    }
    if let Some(v) = opts.listen_port_tls {
      self.listen_port_tls = Some(v);
    }
    if let Some(v) = opts.certs_watch_period_ms {
      self.certs_watch_period_ms = Some(v);
    }
    self
  }
}

impl TryInto<ServiceConfig> for &ConfigToml {
  type Error = anyhow::Error;

  fn try_into(self) -> std::result::Result<ServiceConfig, Self::Error> {
    let tls_cert_path = self.tls_cert_path.as_ref().ok_or(anyhow!("Missing tls_cert_path"))?;
    let tls_cert_key_path = self.tls_cert_key_path.as_ref().ok_or(anyhow!("Missing tls_cert_key_path"))?;
    ensure!(
      !tls_cert_path.is_empty() && !tls_cert_key_path.is_empty(),
      "tls_cert_path and tls_cert_key_path must not be empty"
    );

    let address = self.listen_address.as_deref().unwrap_or(LISTEN_ADDRESS);
    let port = self.listen_port_tls.unwrap_or(LISTEN_PORT_TLS);
    // NOTE: bracketed ipv6 literal like [::] is accepted as well
    let listen_socket: SocketAddr = format!("{address}:{port}")
      .parse()
      .with_context(|| format!("Invalid listen address: {address}:{port}"))?;

    let watch_period_ms = self.certs_watch_period_ms.unwrap_or(CERTS_WATCH_PERIOD_MS);
    ensure!(
      watch_period_ms >= MIN_CERTS_WATCH_PERIOD_MS,
      "certs_watch_period_ms must be at least {MIN_CERTS_WATCH_PERIOD_MS}"
    );
    let certs_watch_period = Duration::from_millis(watch_period_ms);
    ensure!(
      certs_watch_period <= MAX_CERTS_WATCH_PERIOD,
      "certs_watch_period_ms must be at most {}",
      MAX_CERTS_WATCH_PERIOD.as_millis()
    );

    Ok(ServiceConfig {
      listen_socket,
      tls_cert_path: PathBuf::from(tls_cert_path),
      tls_cert_key_path: PathBuf::from(tls_cert_key_path),
      certs_watch_period,
    })
  }
}
