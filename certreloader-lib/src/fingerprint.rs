use ahash::RandomState;
use std::{fmt, hash::BuildHasher, sync::OnceLock};

/// Fixed seeds so that fingerprints are comparable for the whole process lifetime
const FINGERPRINT_SEEDS: [u64; 4] = [
  0x243f_6a88_85a3_08d3,
  0x1319_8a2e_0370_7344,
  0xa409_3822_299f_31d0,
  0x082e_fa98_ec4e_6c89,
];

fn hasher() -> &'static RandomState {
  static HASHER: OnceLock<RandomState> = OnceLock::new();
  HASHER.get_or_init(|| {
    let [k0, k1, k2, k3] = FINGERPRINT_SEEDS;
    RandomState::with_seeds(k0, k1, k2, k3)
  })
}

/// Fast non-cryptographic digest of file contents.
/// Only used to tell whether a file has changed since the last accepted load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(u64);

impl Fingerprint {
  pub fn of(bytes: &[u8]) -> Self {
    Fingerprint(hasher().hash_one(bytes))
  }
}

impl fmt::Display for Fingerprint {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:016x}", self.0)
  }
}

/// File contents together with their fingerprint
#[derive(Clone)]
pub struct FingerprintedBytes {
  bytes: Vec<u8>,
  fingerprint: Fingerprint,
}

impl FingerprintedBytes {
  pub fn new(bytes: Vec<u8>) -> Self {
    let fingerprint = Fingerprint::of(&bytes);
    Self { bytes, fingerprint }
  }
  pub fn as_bytes(&self) -> &[u8] {
    &self.bytes
  }
  pub fn fingerprint(&self) -> Fingerprint {
    self.fingerprint
  }
}

// Contents may be a private key, never print them.
impl fmt::Debug for FingerprintedBytes {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("FingerprintedBytes")
      .field("len", &self.bytes.len())
      .field("fingerprint", &self.fingerprint)
      .finish()
  }
}
