use crate::{
    error::{EnvelopeError, Result},
    utils,
};

const ENVELOPE_VERSION: u8 = 1;
const HEADER_LEN: usize = 5;
const WRAPPED_KEY_LEN: usize = 16;

/// Key-store scheme envelope.
///
/// ```text
/// 0        1        2           3..5      5..5+L   5+L..5+L+16
/// version  unused   nonce len   unused    nonce    wrapped key
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    pub version: u8,
    pub nonce: Vec<u8>,
    pub wrapped_key: [u8; 16],
}

/// Bearer scheme envelope.
///
/// `remainder` is everything after the 5 byte header and still contains the
/// key tail spliced in by the issuer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BearerEnvelope {
    pub version: u8,
    pub subkey_len: u8,
    pub payload_offset: u8,
    pub remainder: Vec<u8>,
}

fn check_version(bytes: &[u8]) -> std::result::Result<u8, EnvelopeError> {
    match bytes.first() {
        None => Err(EnvelopeError::Empty),
        Some(&ENVELOPE_VERSION) => Ok(ENVELOPE_VERSION),
        Some(&version) => Err(EnvelopeError::Version(version)),
    }
}

/// Decode a raw key-store scheme envelope.
pub fn decode_key_store_envelope(bytes: &[u8]) -> Result<Envelope> {
    let version = check_version(bytes)?;

    let nonce_len = *bytes.get(2).ok_or(EnvelopeError::TooShort {
        needed: HEADER_LEN + WRAPPED_KEY_LEN,
        actual: bytes.len(),
    })? as usize;

    let needed = HEADER_LEN + nonce_len + WRAPPED_KEY_LEN;

    if bytes.len() < needed {
        return Err(EnvelopeError::TooShort {
            needed,
            actual: bytes.len(),
        }
        .into());
    }

    let nonce_end = HEADER_LEN + nonce_len;
    let nonce = bytes[HEADER_LEN..nonce_end].to_vec();
    let mut wrapped_key = [0; WRAPPED_KEY_LEN];
    wrapped_key.copy_from_slice(&bytes[nonce_end..nonce_end + WRAPPED_KEY_LEN]);

    Ok(Envelope {
        version,
        nonce,
        wrapped_key,
    })
}

/// Decode a base64 encoded bearer scheme envelope.
pub fn decode_bearer_envelope(text: &str) -> Result<BearerEnvelope> {
    let bytes = utils::decode_base64(text.trim()).map_err(EnvelopeError::from)?;
    let version = check_version(&bytes)?;

    if bytes.len() < HEADER_LEN {
        return Err(EnvelopeError::TooShort {
            needed: HEADER_LEN,
            actual: bytes.len(),
        }
        .into());
    }

    Ok(BearerEnvelope {
        version,
        subkey_len: bytes[3],
        payload_offset: bytes[4],
        remainder: bytes[HEADER_LEN..].to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use base64::Engine;

    fn b64(bytes: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    #[test]
    fn decodes_nonce_and_wrapped_key() {
        let mut bytes = vec![1, 0, 5, 0, 0];
        bytes.extend_from_slice(b"ABCDE");
        bytes.extend_from_slice(&[0; 16]);

        let envelope = decode_key_store_envelope(&bytes).unwrap();
        assert_eq!(envelope.version, 1);
        assert_eq!(envelope.nonce, b"ABCDE");
        assert_eq!(envelope.wrapped_key, [0; 16]);
    }

    #[test]
    fn ignores_trailing_bytes() {
        let mut bytes = vec![1, 9, 2, 9, 9];
        bytes.extend_from_slice(b"xy");
        bytes.extend((0..16).map(|x| x as u8));
        bytes.extend_from_slice(b"trailing");

        let envelope = decode_key_store_envelope(&bytes).unwrap();
        assert_eq!(envelope.nonce, b"xy");
        assert_eq!(envelope.wrapped_key[15], 15);
    }

    #[test]
    fn rejects_any_other_version() {
        for version in [0u8, 2, 0x7f, 0xff] {
            let mut bytes = vec![version, 0, 0, 0, 0];
            bytes.extend_from_slice(&[0; 16]);

            assert!(matches!(
                decode_key_store_envelope(&bytes),
                Err(Error::InvalidEnvelope(EnvelopeError::Version(v))) if v == version
            ));
            assert!(matches!(
                decode_bearer_envelope(&b64(&bytes)),
                Err(Error::InvalidEnvelope(EnvelopeError::Version(v))) if v == version
            ));
        }
    }

    #[test]
    fn version_is_checked_before_length() {
        assert!(matches!(
            decode_key_store_envelope(&[2]),
            Err(Error::InvalidEnvelope(EnvelopeError::Version(2)))
        ));
    }

    #[test]
    fn rejects_short_key_store_envelope() {
        let mut bytes = vec![1, 0, 5, 0, 0];
        bytes.extend_from_slice(b"ABCDE");
        bytes.extend_from_slice(&[0; 15]);

        assert!(matches!(
            decode_key_store_envelope(&bytes),
            Err(Error::InvalidEnvelope(EnvelopeError::TooShort {
                needed: 26,
                actual: 25
            }))
        ));
        assert!(matches!(
            decode_key_store_envelope(&[]),
            Err(Error::InvalidEnvelope(EnvelopeError::Empty))
        ));
    }

    #[test]
    fn decodes_bearer_header() {
        let envelope = decode_bearer_envelope(&b64(&[1, 0, 0, 6, 2, 10, 11, 12])).unwrap();
        assert_eq!(envelope.subkey_len, 6);
        assert_eq!(envelope.payload_offset, 2);
        assert_eq!(envelope.remainder, vec![10, 11, 12]);
    }

    #[test]
    fn rejects_bad_bearer_base64() {
        assert!(matches!(
            decode_bearer_envelope("not base64!"),
            Err(Error::InvalidEnvelope(EnvelopeError::Base64(_)))
        ));
        assert!(matches!(
            decode_bearer_envelope(&b64(&[1, 0, 0])),
            Err(Error::InvalidEnvelope(EnvelopeError::TooShort { .. }))
        ));
    }
}
