use crate::error::{Error, Result};
use base64::Engine;
use reqwest::Url;
use std::{
    env,
    path::{Path, PathBuf},
};

const BASE62: &[u8; 62] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

pub(crate) fn decode_base64<T: AsRef<[u8]>>(input: T) -> std::result::Result<Vec<u8>, base64::DecodeError> {
    base64::engine::general_purpose::STANDARD.decode(input)
}

/// Encode `bytes` read as one big-endian unsigned integer in base 62.
///
/// Leading zero bytes carry no value, so zero encodes to an empty string.
pub fn encode_base62(bytes: &[u8]) -> String {
    let mut number = bytes
        .iter()
        .skip_while(|&&x| x == 0)
        .copied()
        .collect::<Vec<_>>();
    let mut digits = Vec::new();

    while !number.is_empty() {
        let mut quotient = Vec::with_capacity(number.len());
        let mut remainder = 0u32;

        for byte in number {
            let acc = (remainder << 8) | byte as u32;
            let digit = acc / 62;
            remainder = acc % 62;

            if !(quotient.is_empty() && digit == 0) {
                quotient.push(digit as u8);
            }
        }

        digits.push(BASE62[remainder as usize]);
        number = quotient;
    }

    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

/// Short output id: the first 8 base-62 digits of the default KID
/// attribute text, taken verbatim (hyphens included).
pub fn short_id(default_kid: &str) -> String {
    encode_base62(default_kid.as_bytes()).chars().take(8).collect()
}

/// Directory of a playlist url, always ending with `/` and without a query.
pub fn base_url(url: &str) -> Result<Url> {
    url.parse::<Url>()
        .and_then(|x| x.join("./"))
        .map_err(|_| Error::Url(url.to_owned()))
}

pub(crate) fn find_ffmpeg() -> Option<PathBuf> {
    let bin = if cfg!(target_os = "windows") {
        "ffmpeg.exe"
    } else {
        "ffmpeg"
    };

    if Path::new(bin).exists() {
        return Some(PathBuf::from(bin));
    }

    env::var_os("PATH")
        .and_then(|paths| env::split_paths(&paths).map(|x| x.join(bin)).find(|x| x.exists()))
}
