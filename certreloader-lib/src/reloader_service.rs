use crate::{
  certs::{parse_certified_key, CertSummary, PublishedCrypto},
  constants::MAX_CERTS_WATCH_PERIOD,
  crypto_source::{CryptoFileSource, CryptoSource},
  default_crypto_provider,
  error::*,
  log::*,
};
use arc_swap::ArcSwap;
use rustls::{crypto::CryptoProvider, sign::CertifiedKey};
use std::{
  fmt,
  path::Path,
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
  },
  time::Duration,
};
use tokio::{
  sync::Mutex,
  time::{interval, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

/* ------------------------------------------------ */
/// Boxed CryptoSource trait object with Send and Sync
type DynCryptoSource = dyn CryptoSource + Send + Sync + 'static;

/// Result of a single reload attempt that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
  /// New certificate and key were parsed and published
  Updated,
  /// Both files are unchanged since the last accepted load, nothing was done
  Unchanged,
}

/* ------------------------------------------------ */
/// State shared between the reloader handle and its background task
struct ReloaderInner {
  source: Box<DynCryptoSource>,
  provider: Arc<CryptoProvider>,
  /// Currently active certificate and the fingerprints it was built from, swapped as a whole
  published: ArcSwap<PublishedCrypto>,
  /// Serializes writers only. Readers never take it.
  reload_lock: Mutex<()>,
}

impl ReloaderInner {
  /// Read, compare, parse and publish.
  /// Any error returns before `published` is touched.
  async fn reload(&self) -> CertReloadResult<ReloadOutcome> {
    let _guard = self.reload_lock.lock().await;

    let raw = self.source.read().await?;
    let fingerprints = raw.fingerprints();
    if self.published.load().is_same_source(fingerprints) {
      debug!("Certificate and private key unchanged ({})", self.source.describe());
      return Ok(ReloadOutcome::Unchanged);
    }

    let certified_key = parse_certified_key(&raw, &self.provider)?;
    drop(raw);

    let (cert_fingerprint, key_fingerprint) = fingerprints;
    let published = PublishedCrypto::new(certified_key, cert_fingerprint, key_fingerprint);
    info!(
      "Publish new certificate: subject = {}, not after = {}, cert fp = {}, key fp = {}",
      published.summary.subject, published.summary.not_after, cert_fingerprint, key_fingerprint
    );
    self.published.store(Arc::new(published));
    Ok(ReloadOutcome::Updated)
  }

  /// Periodic reload loop. Exits only when the token is cancelled.
  async fn watch(self: Arc<Self>, period: Duration, cancel_token: CancellationToken) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // first tick completes immediately and stands for the mandatory load already done
    ticker.tick().await;

    loop {
      tokio::select! {
        biased;
        _ = cancel_token.cancelled() => {
          debug!("Certificate reloader stopped ({})", self.source.describe());
          break;
        }
        _ = ticker.tick() => {
          if let Err(e) = self.reload().await {
            report_reload_error(&e);
          }
        }
      }
    }
  }
}

/// Scheduled failures are never fatal, just reported
fn report_reload_error(e: &CertReloadError) {
  match e {
    CertReloadError::Io {
      kind: CryptoFileKind::Certificate,
      ..
    } => error!("Failed to reload, certificate file is unreadable. Keep the current one: {e}"),
    CertReloadError::Io {
      kind: CryptoFileKind::PrivateKey,
      ..
    } => error!("Failed to reload, private key file is unreadable. Keep the current one: {e}"),
    CertReloadError::KeyPair(_) => {
      error!("Failed to reload, certificate and private key are not a valid pair. Keep the current one: {e}")
    }
    _ => error!("Failed to reload certificate: {e}"),
  }
}

/* ------------------------------------------------ */
/// Holds a TLS server certificate and private key read from files, and keeps them fresh.
///
/// The files are polled at a fixed period in a background task. When either of them has changed,
/// the new pair is parsed and validated, then published in a single atomic swap so that readers of
/// [`CertReloader::get`] see either the whole old pair or the whole new pair. A rotation that fails
/// to read or validate is logged and the previously published pair stays in use.
///
/// The background task runs until [`CertReloader::stop`] is called or the reloader is dropped.
pub struct CertReloader {
  inner: Arc<ReloaderInner>,
  cancel_token: CancellationToken,
  stopped: AtomicBool,
}

impl CertReloader {
  /// Load the certificate and private key at the given paths and start watching them.
  /// Relative paths are resolved against the current directory once, here.
  ///
  /// Must be called within a tokio runtime. On error, no background task is left behind.
  pub async fn try_new<P, Q>(cert_path: P, key_path: Q, watch_period: Duration) -> CertReloadResult<Self>
  where
    P: AsRef<Path>,
    Q: AsRef<Path>,
  {
    let source = CryptoFileSource {
      tls_cert_path: cert_path.as_ref().to_path_buf(),
      tls_cert_key_path: key_path.as_ref().to_path_buf(),
    }
    .to_absolute()?;
    Self::try_new_with_source(source, watch_period).await
  }

  /// Same as [`CertReloader::try_new`] with an arbitrary source of crypto materials
  pub async fn try_new_with_source<T>(source: T, watch_period: Duration) -> CertReloadResult<Self>
  where
    T: CryptoSource + Send + Sync + 'static,
  {
    if watch_period.is_zero() || watch_period > MAX_CERTS_WATCH_PERIOD {
      return Err(CertReloadError::InvalidWatchPeriod);
    }
    let runtime_handle = tokio::runtime::Handle::try_current().map_err(|_| CertReloadError::NoAsyncRuntime)?;
    let provider = default_crypto_provider()?;

    // Mandatory first load: no previous state to compare with
    let raw = source.read().await?;
    let certified_key = parse_certified_key(&raw, &provider)?;
    let (cert_fingerprint, key_fingerprint) = raw.fingerprints();
    drop(raw);
    let published = PublishedCrypto::new(certified_key, cert_fingerprint, key_fingerprint);
    info!(
      "Loaded certificate: subject = {}, not after = {} ({})",
      published.summary.subject,
      published.summary.not_after,
      source.describe()
    );

    let inner = Arc::new(ReloaderInner {
      source: Box::new(source),
      provider,
      published: ArcSwap::from_pointee(published),
      reload_lock: Mutex::new(()),
    });
    let cancel_token = CancellationToken::new();
    runtime_handle.spawn(inner.clone().watch(watch_period, cancel_token.clone()));
    debug!("Certificate reloader started with period {watch_period:?}");

    Ok(Self {
      inner,
      cancel_token,
      stopped: AtomicBool::new(false),
    })
  }

  /// Currently published certificate and signing key. Never blocks.
  pub fn get(&self) -> Arc<CertifiedKey> {
    self.inner.published.load().certified_key.clone()
  }

  /// Summary of the currently published certificate
  pub fn summary(&self) -> CertSummary {
    self.inner.published.load().summary.clone()
  }

  /// Run one reload attempt right now, with the same semantics as a scheduled one.
  /// Works after [`CertReloader::stop`] as well, since it does not involve the background task.
  pub async fn reload(&self) -> CertReloadResult<ReloadOutcome> {
    self.inner.reload().await
  }

  /// Stop further periodic reloading. Idempotent, and a stopped reloader cannot be started again.
  /// The last published certificate remains available through [`CertReloader::get`].
  pub fn stop(&self) {
    if self.mark_stopped() {
      info!("Stop certificate reloader ({})", self.inner.source.describe());
    }
    self.cancel_token.cancel();
  }

  /// True only for the single call that switched the reloader to stopped
  fn mark_stopped(&self) -> bool {
    !self.stopped.swap(true, Ordering::AcqRel)
  }

  /// Whether [`CertReloader::stop`] has been called
  pub fn is_stopped(&self) -> bool {
    self.cancel_token.is_cancelled()
  }

  /// Description of the watched source, e.g., file paths
  pub fn source(&self) -> String {
    self.inner.source.describe()
  }

  /// Absolute path of the watched certificate file. `None` for sources not backed by files.
  pub fn cert_path(&self) -> Option<&Path> {
    self.inner.source.watched_paths().map(|(cert, _)| cert)
  }

  /// Absolute path of the watched private key file. `None` for sources not backed by files.
  pub fn key_path(&self) -> Option<&Path> {
    self.inner.source.watched_paths().map(|(_, key)| key)
  }
}

impl Drop for CertReloader {
  fn drop(&mut self) {
    self.cancel_token.cancel();
  }
}

impl fmt::Debug for CertReloader {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CertReloader")
      .field("source", &self.inner.source.describe())
      .field("summary", &self.inner.published.load().summary)
      .field("stopped", &self.is_stopped())
      .finish()
  }
}

/* ------------------------------------------------ */
