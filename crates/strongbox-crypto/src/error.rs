//! Error types for the strongbox-crypto crate

use thiserror::Error;

/// Result type alias using `CryptoError`
pub type Result<T> = std::result::Result<T, CryptoError>;

/// Errors that can occur during cryptographic operations
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Malformed or truncated blob, or an unknown mode/complexity tag
    #[error("invalid format: {0}")]
    Format(String),

    /// A typed value did not serialize or deserialize against its schema
    #[error("schema validation failed: {0}")]
    SchemaValidation(String),

    /// No usable key-set id was embedded in a blob
    #[error("not found: {0}")]
    NotFound(String),

    /// Key generation failed
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// Encryption failed
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Decryption failed
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// Signing failed
    #[error("signing failed: {0}")]
    Signing(String),

    /// Invalid key format or length
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Base64 decode error
    #[error("base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// Decrypted bytes were not UTF-8
    #[error("utf-8 decode error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl CryptoError {
    /// The blob itself was malformed (including undecodable base64 or text)
    pub fn is_format(&self) -> bool {
        matches!(self, Self::Format(_) | Self::Base64Decode(_) | Self::Utf8(_))
    }

    /// The value failed its schema, as opposed to a key or ciphertext problem
    pub fn is_schema_validation(&self) -> bool {
        matches!(self, Self::SchemaValidation(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<serde_json::Error> for CryptoError {
    fn from(e: serde_json::Error) -> Self {
        Self::SchemaValidation(e.to_string())
    }
}
