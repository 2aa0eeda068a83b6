pub const LISTEN_ADDRESS: &str = "0.0.0.0";
pub const LISTEN_PORT_TLS: u16 = 8443;
/// Certificate watch period in milliseconds, when not given in config nor cli
pub const CERTS_WATCH_PERIOD_MS: u64 = 60_000;
/// Smallest accepted watch period in milliseconds
pub const MIN_CERTS_WATCH_PERIOD_MS: u64 = 10;
pub const TLS_HANDSHAKE_TIMEOUT_SEC: u64 = 15; // default as with firefox browser
pub const RESPONSE_HEADER_SERVER: &str = "certreloader";
