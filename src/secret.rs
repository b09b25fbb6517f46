use constant_time_eq::constant_time_eq;
use rand::RngCore;
use std::fmt;

/// Shared submission token. Generated once per process and never persisted;
/// a restart invalidates every previously distributed value.
#[derive(Clone)]
pub struct Secret(String);

impl Secret {
    pub fn generate(len_bytes: usize) -> Self {
        let mut bytes = vec![0u8; len_bytes.max(1)];
        rand::rng().fill_bytes(&mut bytes);
        Self(hex::encode(&bytes))
    }

    pub fn from_value(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Exact match, compared in constant time.
    pub fn matches(&self, candidate: &str) -> bool {
        constant_time_eq(self.0.as_bytes(), candidate.as_bytes())
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}
