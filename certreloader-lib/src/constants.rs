use std::time::Duration;

/// Default period to watch the certificate and the private key
pub const DEFAULT_CERTS_WATCH_PERIOD: Duration = Duration::from_secs(60);

/// Longest accepted watch period, one year
pub const MAX_CERTS_WATCH_PERIOD: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// ALPN protocols advertised by the server config built over the reloader
pub(crate) const ALPN_PROTOCOLS: &[&[u8]] = &[b"h2", b"http/1.1"];
