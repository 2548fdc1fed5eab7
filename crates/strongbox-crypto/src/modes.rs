//! Algorithm-suite identifiers
//!
//! Each operation family has its own closed set of suites. A suite has a
//! stable name and a stable one-byte wire tag. Tags are append-only: a tag is
//! never reused or renumbered, and decoding an unknown tag fails.

use crate::{CryptoError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Common behaviour of the per-operation suite tables
pub trait WireMode: Sized + Copy + fmt::Debug + 'static {
    /// Human readable family name, used in error messages
    const FAMILY: &'static str;

    /// Every member of the table, in tag order
    const ALL: &'static [Self];

    /// The one-byte tag written on the wire
    fn to_wire(self) -> u8;

    /// The stable suite name
    fn as_str(self) -> &'static str;

    /// Look up a wire tag
    fn from_wire(tag: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|m| m.to_wire() == tag)
    }

    /// Look up a wire tag, failing with a format error when unknown
    fn decode_tag(tag: u8) -> Result<Self> {
        Self::from_wire(tag).ok_or_else(|| {
            CryptoError::Format(format!("unknown {} mode tag {}", Self::FAMILY, tag))
        })
    }

    /// Look up a suite name
    fn parse_name(name: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == name)
            .ok_or_else(|| CryptoError::Format(format!("unknown {} mode {:?}", Self::FAMILY, name)))
    }
}

/// Hybrid RSA-OAEP / AES-GCM encryption suites
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EncryptionMode {
    /// RSA-OAEP (4096-bit, SHA-256) with AES-256-GCM for enveloped payloads
    #[default]
    #[serde(rename = "RSA-OAEP-4096-SHA256_AES-GCM-256")]
    RsaOaep4096Aes256Gcm,
}

impl WireMode for EncryptionMode {
    const FAMILY: &'static str = "encryption";
    const ALL: &'static [Self] = &[Self::RsaOaep4096Aes256Gcm];

    fn to_wire(self) -> u8 {
        match self {
            Self::RsaOaep4096Aes256Gcm => 1,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::RsaOaep4096Aes256Gcm => "RSA-OAEP-4096-SHA256_AES-GCM-256",
        }
    }
}

/// Password-based encryption suites
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PasswordEncryptionMode {
    /// PBKDF2-HMAC-SHA256 with 650,000 rounds, feeding AES-256-GCM
    #[default]
    #[serde(rename = "PBKDF2-SHA256-650000_AES-GCM-256")]
    Pbkdf2Sha256Aes256Gcm,
}

impl PasswordEncryptionMode {
    /// PBKDF2 round count fixed by the suite
    pub fn iterations(self) -> u32 {
        match self {
            Self::Pbkdf2Sha256Aes256Gcm => 650_000,
        }
    }
}

impl WireMode for PasswordEncryptionMode {
    const FAMILY: &'static str = "password encryption";
    const ALL: &'static [Self] = &[Self::Pbkdf2Sha256Aes256Gcm];

    fn to_wire(self) -> u8 {
        match self {
            Self::Pbkdf2Sha256Aes256Gcm => 1,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Pbkdf2Sha256Aes256Gcm => "PBKDF2-SHA256-650000_AES-GCM-256",
        }
    }
}

/// Signature suites
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SigningMode {
    /// RSASSA-PKCS1-v1_5 over SHA-256 with 4096-bit keys
    #[default]
    #[serde(rename = "RSASSA-PKCS1-v1_5-4096-SHA256")]
    RsassaPkcs1v15Sha256,
}

impl WireMode for SigningMode {
    const FAMILY: &'static str = "signing";
    const ALL: &'static [Self] = &[Self::RsassaPkcs1v15Sha256];

    fn to_wire(self) -> u8 {
        match self {
            Self::RsassaPkcs1v15Sha256 => 1,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::RsassaPkcs1v15Sha256 => "RSASSA-PKCS1-v1_5-4096-SHA256",
        }
    }
}

macro_rules! impl_display_from_str {
    ($($mode:ty),*) => {$(
        impl fmt::Display for $mode {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $mode {
            type Err = CryptoError;

            fn from_str(s: &str) -> Result<Self> {
                Self::parse_name(s)
            }
        }
    )*};
}

impl_display_from_str!(EncryptionMode, PasswordEncryptionMode, SigningMode);
