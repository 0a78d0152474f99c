//! Bearer envelope scheme.
//!
//! The AES-128 key is split between the envelope and the bearer credential:
//! the last `16 - n` bytes of the envelope body followed by the last `n` bytes
//! of the bearer. Once the envelope tail is removed, everything after the
//! payload offset is AES-128-CBC ciphertext (zero IV) of a JSON web key list.

use super::{ContentKey, envelope::decode_bearer_envelope};
use crate::{
    error::{Error, Result},
    utils,
};
use aes::cipher::{BlockDecryptMut, KeyIvInit, block_padding::NoPadding};
use log::debug;
use serde::Deserialize;

type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

const KEY_LEN: usize = 16;

#[derive(Debug, Deserialize)]
pub struct KeyList {
    pub keys: Vec<JsonWebKey>,
}

#[derive(Debug, Deserialize)]
pub struct JsonWebKey {
    pub k: String,
    #[serde(default)]
    pub kid: String,
    #[serde(default)]
    pub kty: String,
}

/// Resolve the content key held in a bearer envelope.
pub fn resolve(ev: &str, bearer: &str) -> Result<ContentKey> {
    let json = decrypt_key_list(ev, bearer)?;
    let list = serde_json::from_str::<KeyList>(&json)?;
    let first = list.keys.first().ok_or(Error::NoKeysFound)?;

    if !first.kid.is_empty() {
        debug!("Using key list entry kid={} kty={}", first.kid, first.kty);
    }

    ContentKey::try_from(decode_key_material(&first.k)?.as_slice())
}

/// Decrypt the envelope payload and return the JSON key list it carries.
pub fn decrypt_key_list(ev: &str, bearer: &str) -> Result<String> {
    let envelope = decode_bearer_envelope(ev)?;
    let subkey_len = envelope.subkey_len as usize;
    let offset = envelope.payload_offset as usize;
    let mut body = envelope.remainder;

    if bearer.len() < subkey_len || subkey_len > KEY_LEN {
        return Err(Error::InvalidBearerSubkey {
            needed: subkey_len,
            actual: bearer.len(),
        });
    }

    let subkey = &bearer.as_bytes()[bearer.len() - subkey_len..];
    let tail_len = KEY_LEN - subkey_len;

    if tail_len > body.len() {
        return Err(Error::InvalidCiphertextLength(body.len()));
    }

    let mut key = [0; KEY_LEN];
    let split = body.len() - tail_len;
    key[..tail_len].copy_from_slice(&body[split..]);
    key[tail_len..].copy_from_slice(subkey);

    body.truncate(split);

    if offset > body.len() || (body.len() - offset) % KEY_LEN != 0 {
        return Err(Error::InvalidCiphertextLength(body.len()));
    }

    let payload = &mut body[offset..];
    let iv = [0u8; KEY_LEN];

    Aes128CbcDec::new(&key.into(), &iv.into())
        .decrypt_padded_mut::<NoPadding>(payload)
        .map_err(|x| Error::Cipher(x.to_string()))?;

    Ok(String::from_utf8_lossy(extract_json(payload)).into_owned())
}

/// Slice from the first `{` to the last `}`, or the whole input if either is missing.
pub fn extract_json(data: &[u8]) -> &[u8] {
    let start = data.iter().position(|&x| x == b'{');
    let end = data.iter().rposition(|&x| x == b'}');

    match (start, end) {
        (Some(start), Some(end)) if start <= end => &data[start..=end],
        _ => data,
    }
}

/// Decode a JWK `k` value, accepting both url-safe and standard alphabets with or without padding.
pub fn decode_key_material(k: &str) -> Result<Vec<u8>> {
    let mut k = k.replace('-', "+").replace('_', "/");

    while k.len() % 4 != 0 {
        k.push('=');
    }

    Ok(utils::decode_base64(k)?)
}
