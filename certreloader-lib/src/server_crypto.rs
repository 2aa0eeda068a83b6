use crate::{constants::ALPN_PROTOCOLS, default_crypto_provider, error::*, reloader_service::CertReloader};
use rustls::{
  server::{ClientHello, ResolvesServerCert},
  sign::CertifiedKey,
  ServerConfig,
};
use std::sync::Arc;

/* ------------------------------------------------ */
/// Every handshake is served with whatever pair is published at that moment
impl ResolvesServerCert for CertReloader {
  fn resolve(&self, _client_hello: ClientHello<'_>) -> Option<Arc<CertifiedKey>> {
    Some(self.get())
  }
}

/// Build a rustls server config without client authentication whose certificate is resolved by the reloader.
/// A config built once keeps serving rotated certificates, so listeners never need to be rebuilt.
pub fn build_server_config(reloader: Arc<CertReloader>) -> CertReloadResult<ServerConfig> {
  let provider = default_crypto_provider()?;

  let mut server_config = ServerConfig::builder_with_provider(provider)
    .with_safe_default_protocol_versions()?
    .with_no_client_auth()
    .with_cert_resolver(reloader);
  server_config.alpn_protocols = ALPN_PROTOCOLS.iter().map(|p| p.to_vec()).collect();

  Ok(server_config)
}

/* ------------------------------------------------ */
#[cfg(test)]
mod tests {
  use super::*;
  use crate::{reloader_service::ReloadOutcome, test_utils::*};
  use rustls::{
    pki_types::{CertificateDer, ServerName},
    ClientConfig, ClientConnection, RootCertStore, ServerConnection,
  };
  use std::{
    net::{TcpListener, TcpStream},
    time::Duration,
  };

  /// Full handshake over loopback, returns the leaf certificate the client received
  fn handshake_peer_cert(server_config: Arc<ServerConfig>, trusted: &[u8]) -> Vec<u8> {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = std::thread::spawn(move || {
      let (mut sock, _) = listener.accept().unwrap();
      let mut conn = ServerConnection::new(server_config).unwrap();
      while conn.is_handshaking() {
        conn.complete_io(&mut sock).unwrap();
      }
    });

    let mut roots = RootCertStore::empty();
    roots.add(CertificateDer::from(trusted.to_vec())).unwrap();
    let client_config = ClientConfig::builder()
      .with_root_certificates(roots)
      .with_no_client_auth();
    let server_name = ServerName::try_from("localhost".to_string()).unwrap();
    let mut conn = ClientConnection::new(Arc::new(client_config), server_name).unwrap();
    let mut sock = TcpStream::connect(addr).unwrap();
    while conn.is_handshaking() {
      conn.complete_io(&mut sock).unwrap();
    }
    let peer = conn.peer_certificates().unwrap()[0].to_vec();
    server.join().unwrap();
    peer
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
  async fn server_config_serves_rotated_certificate() {
    let a = generate_ecdsa("localhost");
    let b = generate_rsa("localhost");
    let dir = tempfile::tempdir().unwrap();
    let (cert, key) = (dir.path().join("server.crt"), dir.path().join("server.key"));
    write_pair(&cert, &key, &a);

    let reloader = Arc::new(
      CertReloader::try_new(&cert, &key, Duration::from_secs(3600))
        .await
        .unwrap(),
    );
    let server_config = Arc::new(build_server_config(reloader.clone()).unwrap());
    assert_eq!(server_config.alpn_protocols, vec![b"h2".to_vec(), b"http/1.1".to_vec()]);

    let (config, trusted) = (server_config.clone(), a.cert_der.clone());
    let peer = tokio::task::spawn_blocking(move || handshake_peer_cert(config, &trusted))
      .await
      .unwrap();
    assert_eq!(peer, a.cert_der);

    // same config object, new certificate
    write_pair(&cert, &key, &b);
    assert_eq!(reloader.reload().await.unwrap(), ReloadOutcome::Updated);
    let (config, trusted) = (server_config.clone(), b.cert_der.clone());
    let peer = tokio::task::spawn_blocking(move || handshake_peer_cert(config, &trusted))
      .await
      .unwrap();
    assert_eq!(peer, b.cert_der);
  }
}
