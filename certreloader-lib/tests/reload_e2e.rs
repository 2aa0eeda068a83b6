mod common;

use certreloader_lib::{CertReloadError, CertReloader, CryptoFileKind, KeyPairError, ReloadOutcome};
use common::{generate_rsa_pair, CertDir};
use std::{sync::Arc, time::Duration};
use tokio::time::sleep;
use x509_parser::prelude::*;

const PERIOD: Duration = Duration::from_millis(50);
/// A little more than one period, with slack for slow CI machines
const SETTLE: Duration = Duration::from_millis(250);

fn served_public_key(reloader: &CertReloader) -> Vec<u8> {
  let certified_key = reloader.get();
  let der = certified_key.end_entity_cert().unwrap();
  let (_, cert) = parse_x509_certificate(der).unwrap();
  cert.public_key().raw.to_vec()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn rotation_then_stop() {
  let dir = CertDir::new();
  let first = generate_rsa_pair("localhost");
  let second = generate_rsa_pair("localhost");
  let third = generate_rsa_pair("localhost");
  dir.write(&first);

  let reloader = CertReloader::try_new(&dir.cert, &dir.key, PERIOD).await.unwrap();
  sleep(SETTLE).await;
  assert_eq!(served_public_key(&reloader), first.public_key_der);

  dir.write(&second);
  sleep(SETTLE).await;
  assert_eq!(reloader.get().end_entity_cert().unwrap().as_ref(), second.cert_der.as_slice());
  assert_eq!(served_public_key(&reloader), second.public_key_der);

  reloader.stop();
  let last = reloader.get();
  dir.write(&third);
  sleep(SETTLE).await;
  assert_eq!(served_public_key(&reloader), second.public_key_der);
  assert!(Arc::ptr_eq(&last, &reloader.get()));

  reloader.stop();
  assert!(reloader.is_stopped());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn bad_rotation_is_survived() {
  let dir = CertDir::new();
  let good = generate_rsa_pair("localhost");
  let next = generate_rsa_pair("localhost");
  dir.write(&good);

  let reloader = CertReloader::try_new(&dir.cert, &dir.key, PERIOD).await.unwrap();
  let before = reloader.get();

  // the periodic task reports the failure and keeps going
  std::fs::write(&dir.cert, "-----BEGIN CERTIFICATE-----\nnot base64\n-----END CERTIFICATE-----\n").unwrap();
  sleep(SETTLE).await;
  assert!(Arc::ptr_eq(&before, &reloader.get()));
  assert!(matches!(reloader.reload().await, Err(CertReloadError::KeyPair(_))));

  // a certificate whose key has not been written yet
  std::fs::write(&dir.cert, &next.cert).unwrap();
  assert!(matches!(
    reloader.reload().await,
    Err(CertReloadError::KeyPair(KeyPairError::KeyMismatch(_)))
  ));
  sleep(SETTLE).await;
  assert!(Arc::ptr_eq(&before, &reloader.get()));

  // the loop is still alive and picks the completed rotation up
  std::fs::write(&dir.key, &next.key).unwrap();
  sleep(SETTLE).await;
  assert_eq!(served_public_key(&reloader), next.public_key_der);
  assert_eq!(reloader.reload().await.unwrap(), ReloadOutcome::Unchanged);
}

#[tokio::test]
async fn construction_fails_without_certificate() {
  let dir = CertDir::new();
  let pair = generate_rsa_pair("localhost");
  std::fs::write(&dir.key, &pair.key).unwrap();

  let res = CertReloader::try_new(&dir.cert, &dir.key, PERIOD).await;
  match res {
    Err(CertReloadError::Io { kind, path, .. }) => {
      assert_eq!(kind, CryptoFileKind::Certificate);
      assert_eq!(path, dir.cert);
    }
    other => panic!("unexpected result: {other:?}"),
  }
}
