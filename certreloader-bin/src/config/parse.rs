use super::toml::ConfigToml;
use clap::{value_parser, Arg};
use std::{net::SocketAddr, path::PathBuf, time::Duration};

/// Parsed options
pub struct Opts {
  pub config_file_path: Option<String>,
  pub tls_cert_path: Option<String>,
  pub tls_cert_key_path: Option<String>,
  pub listen_address: Option<String>,
  pub listen_port_tls: Option<u16>,
  pub certs_watch_period_ms: Option<u64>,
}

/// Settings of the https service, fully resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
  pub listen_socket: SocketAddr,
  pub tls_cert_path: PathBuf,
  pub tls_cert_key_path: PathBuf,
  pub certs_watch_period: Duration,
}

/// Parse arg values passed from cli
pub fn parse_opts() -> Result<Opts, anyhow::Error> {
  let _ = include_str!("../../Cargo.toml");
  let options = clap::command!()
    .arg(
      Arg::new("config_file")
        .long("config")
        .short('c')
        .value_name("FILE")
        .help("Configuration file path like ./config.toml"),
    )
    .arg(
      Arg::new("cert")
        .long("cert")
        .value_name("FILE")
        .help("PEM certificate (chain) to serve and watch, overrides tls_cert_path"),
    )
    .arg(
      Arg::new("key")
        .long("key")
        .value_name("FILE")
        .help("PEM private key to serve and watch, overrides tls_cert_key_path"),
    )
    .arg(
      Arg::new("listen_address")
        .long("listen")
        .short('l')
        .value_name("ADDR")
        .help("Listen address like 0.0.0.0 or [::], overrides listen_address"),
    )
    .arg(
      Arg::new("port")
        .long("port")
        .short('p')
        .value_name("PORT")
        .value_parser(value_parser!(u16))
        .help("Listen port for https, overrides listen_port_tls"),
    )
    .arg(
      Arg::new("watch_period_ms")
        .long("watch-period-ms")
        .value_name("MILLIS")
        .value_parser(value_parser!(u64))
        .help("Period in milliseconds to check the certificate and key files, overrides certs_watch_period_ms"),
    );
  let matches = options.get_matches();

  ///////////////////////////////////
  Ok(Opts {
    config_file_path: matches.get_one::<String>("config_file").cloned(),
    tls_cert_path: matches.get_one::<String>("cert").cloned(),
    tls_cert_key_path: matches.get_one::<String>("key").cloned(),
    listen_address: matches.get_one::<String>("listen_address").cloned(),
    listen_port_tls: matches.get_one::<u16>("port").copied(),
    certs_watch_period_ms: matches.get_one::<u64>("watch_period_ms").copied(),
  })
}

/// Build service settings from the config file, if any, and cli options
pub fn build_settings(opts: &Opts) -> std::result::Result<ServiceConfig, anyhow::Error> {
  let config_toml = match opts.config_file_path.as_deref() {
    Some(path) => ConfigToml::new(path)?,
    None => ConfigToml::default(),
  };
  let config_toml = config_toml.override_with(opts);
  (&config_toml).try_into()
}
