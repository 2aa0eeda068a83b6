use crate::{constants::*, error::*, log::*};
use certreloader_lib::{reexports::ServerConfig, CertReloader};
use http_body_util::Full;
use hyper::{
  body::{Bytes, Incoming},
  header::{self, HeaderValue},
  service::service_fn,
  Request, Response,
};
use hyper_util::{
  rt::{TokioExecutor, TokioIo},
  server::conn::auto::Builder as ConnectionBuilder,
};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio::{
  net::{TcpListener, TcpStream},
  time::timeout,
};
use tokio_rustls::TlsAcceptor;

/// Https service answering every request with the certificate currently served.
/// The rustls config is built once; certificate rotation happens underneath it through the reloader.
pub struct HttpsService {
  tcp_listener: TcpListener,
  tls_acceptor: TlsAcceptor,
  reloader: Arc<CertReloader>,
  connection_builder: Arc<ConnectionBuilder<TokioExecutor>>,
}

impl HttpsService {
  /// Bind the listen socket
  pub async fn bind(
    listen_socket: &SocketAddr,
    server_config: Arc<ServerConfig>,
    reloader: Arc<CertReloader>,
  ) -> Result<Self, anyhow::Error> {
    let tcp_listener = TcpListener::bind(listen_socket)
      .await
      .with_context(|| format!("Failed to bind {listen_socket}"))?;
    Ok(Self {
      tcp_listener,
      tls_acceptor: TlsAcceptor::from(server_config),
      reloader,
      connection_builder: Arc::new(ConnectionBuilder::new(TokioExecutor::new())),
    })
  }

  pub fn local_addr(&self) -> Result<SocketAddr, anyhow::Error> {
    self.tcp_listener.local_addr().map_err(|e| anyhow!(e))
  }

  /// Accept loop. Each connection is handshaked and served in its own task.
  pub async fn serve(self) -> Result<(), anyhow::Error> {
    info!("Start https service on {}", self.local_addr()?);
    loop {
      let (raw_stream, client_addr) = match self.tcp_listener.accept().await {
        Ok(v) => v,
        Err(e) => {
          warn!("Failed to accept tcp connection: {e}");
          continue;
        }
      };
      self.serve_connection(raw_stream, client_addr);
    }
  }

  fn serve_connection(&self, raw_stream: TcpStream, client_addr: SocketAddr) {
    let tls_acceptor = self.tls_acceptor.clone();
    let reloader = self.reloader.clone();
    let connection_builder = self.connection_builder.clone();

    tokio::spawn(async move {
      // timeout is introduced to avoid get stuck here.
      let stream = match timeout(
        Duration::from_secs(TLS_HANDSHAKE_TIMEOUT_SEC),
        tls_acceptor.accept(raw_stream),
      )
      .await
      {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => {
          warn!("Failed to handshake TLS with {client_addr}: {e}");
          return;
        }
        Err(_) => {
          warn!("Timeout to handshake TLS with {client_addr}");
          return;
        }
      };

      let served = connection_builder
        .serve_connection(
          TokioIo::new(stream),
          service_fn(move |req: Request<Incoming>| serve_request(req, reloader.clone(), client_addr)),
        )
        .await;
      if let Err(e) = served {
        debug!("Connection with {client_addr} closed with error: {e}");
      }
    });
  }
}

async fn serve_request(
  req: Request<Incoming>,
  reloader: Arc<CertReloader>,
  client_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
  let summary = reloader.summary();
  info!(
    "{} <- {} -- {} {} {:?} -- served cert: {}",
    req.headers().get(header::HOST).and_then(|v| v.to_str().ok()).unwrap_or(""),
    client_addr,
    req.method(),
    req.uri(),
    req.version(),
    summary.cert_fingerprint
  );

  let body = format!(
    "subject: {}\nnot after: {}\nchain length: {}\ncert fingerprint: {}\nkey fingerprint: {}\n",
    summary.subject, summary.not_after, summary.chain_len, summary.cert_fingerprint, summary.key_fingerprint
  );
  let mut res = Response::new(Full::new(Bytes::from(body)));
  let headers = res.headers_mut();
  headers.insert(header::SERVER, HeaderValue::from_static(RESPONSE_HEADER_SERVER));
  headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
  Ok(res)
}
