#[global_allocator]
static ALLOC: mimalloc::MiMalloc = mimalloc::MiMalloc;

mod config;
mod constants;
mod error;
mod log;
mod service;

use crate::{
  config::{build_settings, parse_opts, ServiceConfig},
  log::*,
  service::HttpsService,
};
use certreloader_lib::{build_server_config, CertReloader};
use std::sync::Arc;

fn main() {
  init_logger();

  let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
  runtime_builder.enable_all();
  runtime_builder.thread_name("certreloader");
  let runtime = match runtime_builder.build() {
    Ok(v) => v,
    Err(e) => {
      error!("Failed to build async runtime: {e}");
      std::process::exit(1);
    }
  };

  runtime.block_on(async {
    // Initially load options
    let Ok(parsed_opts) = parse_opts() else {
      error!("Invalid command line options");
      std::process::exit(1);
    };
    let service_config = match build_settings(&parsed_opts) {
      Ok(v) => v,
      Err(e) => {
        error!("Invalid configuration: {e:#}");
        std::process::exit(1);
      }
    };

    if let Err(e) = certreloader_service(&service_config).await {
      error!("certreloader service exited: {e:#}");
      std::process::exit(1);
    }
  });
}

async fn certreloader_service(service_config: &ServiceConfig) -> Result<(), anyhow::Error> {
  info!(
    "Start certreloader service: watching {} and {} every {:?}",
    service_config.tls_cert_path.display(),
    service_config.tls_cert_key_path.display(),
    service_config.certs_watch_period
  );
  let reloader = Arc::new(
    CertReloader::try_new(
      &service_config.tls_cert_path,
      &service_config.tls_cert_key_path,
      service_config.certs_watch_period,
    )
    .await?,
  );
  let summary = reloader.summary();
  info!("Serving certificate for {} (not after {})", summary.subject, summary.not_after);

  let server_config = Arc::new(build_server_config(reloader.clone())?);
  let https_service = HttpsService::bind(&service_config.listen_socket, server_config, reloader.clone()).await?;

  let res = tokio::select! {
    res = https_service.serve() => res,
    res = tokio::signal::ctrl_c() => {
      info!("Received shutdown signal");
      res.map_err(anyhow::Error::from)
    }
  };
  reloader.stop();
  res
}
