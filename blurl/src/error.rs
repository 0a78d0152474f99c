use thiserror::Error;

/// Why an envelope blob was rejected.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("envelope is empty")]
    Empty,

    #[error("unsupported envelope version {0} (expected 1)")]
    Version(u8),

    #[error("envelope is too short ({actual} bytes, at least {needed} required)")]
    TooShort { needed: usize, actual: usize },

    #[error("envelope is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// The error type returned by key resolution and download operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid envelope: {0}")]
    InvalidEnvelope(#[from] EnvelopeError),

    #[error("No matching key found in key store")]
    KeyNotFound,

    #[error("Bearer credential is shorter than the required subkey ({actual} < {needed} bytes)")]
    InvalidBearerSubkey { needed: usize, actual: usize },

    #[error("Ciphertext length {0} is not a multiple of the AES block size")]
    InvalidCiphertextLength(usize),

    #[error("No keys found in envelope key list")]
    NoKeysFound,

    #[error("Content key must be 16 bytes but found {0}")]
    InvalidContentKey(usize),

    #[error("Cipher error: {0}")]
    Cipher(String),

    #[error("Failed to fetch {url} (HTTP {status})")]
    Network { url: String, status: u16 },

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Invalid url '{0}'")]
    Url(String),

    #[error("Invalid descriptor: {0}")]
    Descriptor(String),

    #[error("Invalid manifest: {0}")]
    Manifest(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("{0}")]
    Toolchain(String),

    #[error("Download cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for blurl operations.
pub type Result<T> = std::result::Result<T, Error>;
