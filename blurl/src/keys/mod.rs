//! Content key recovery.
//!
//! Two envelope schemes are supported. The key-store scheme carries a nonce
//! and a wrapped key which is unwrapped with a key found in a local record
//! file ([`KeyStore`]). The bearer scheme carries an encrypted JSON key list
//! whose AES key is spliced together from the envelope tail and the caller's
//! bearer credential ([`bearer::resolve`]).

pub mod bearer;
mod envelope;
mod store;

pub use envelope::{BearerEnvelope, Envelope, decode_bearer_envelope, decode_key_store_envelope};
pub use store::{KeyStore, RECORD_STRIDE};

use crate::error::{Error, Result};
use std::fmt;

/// A resolved 16 byte content key.
#[derive(Clone, PartialEq, Eq)]
pub struct ContentKey([u8; 16]);

impl ContentKey {
    pub fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Lowercase hex, the form consumed by the media toolchain.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl TryFrom<&[u8]> for ContentKey {
    type Error = Error;

    fn try_from(value: &[u8]) -> Result<Self> {
        let bytes = <[u8; 16]>::try_from(value).map_err(|_| Error::InvalidContentKey(value.len()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// Keys never end up in debug logs verbatim.
impl fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentKey({}..)", &self.to_hex()[..4])
    }
}

/// Which envelope scheme to resolve the content key with.
#[derive(Clone, Debug)]
pub enum KeySource {
    KeyStore(std::path::PathBuf),
    Bearer(String),
}

impl KeySource {
    /// Resolve the content key for a base64 encoded envelope value.
    pub fn resolve(&self, ev: &str) -> Result<ContentKey> {
        match self {
            Self::KeyStore(path) => {
                let raw = crate::utils::decode_base64(ev).map_err(crate::error::EnvelopeError::from)?;
                let envelope = decode_key_store_envelope(&raw)?;
                KeyStore::open(path)?.resolve(&envelope.nonce, &envelope.wrapped_key)
            }
            Self::Bearer(token) => bearer::resolve(ev, token),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_key_renders_lowercase_hex() {
        let key = ContentKey::new([0xAB; 16]);
        assert_eq!(key.to_hex(), "ab".repeat(16));
        assert_eq!(key.to_string(), key.to_hex());
    }

    #[test]
    fn content_key_rejects_wrong_length() {
        let err = ContentKey::try_from(&[0u8; 15][..]).unwrap_err();
        assert!(matches!(err, Error::InvalidContentKey(15)));
    }
}
