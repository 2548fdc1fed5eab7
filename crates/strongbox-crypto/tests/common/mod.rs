//! Key material shared across the integration tests
//!
//! 4096-bit generation is slow, so each test binary mints its pairs once.

#![allow(dead_code)]

use std::sync::OnceLock;
use strongbox_crypto::{EncryptionKeyPair, SigningKeyPair};

pub fn encryption_pair() -> &'static EncryptionKeyPair {
    static PAIR: OnceLock<EncryptionKeyPair> = OnceLock::new();
    PAIR.get_or_init(|| EncryptionKeyPair::generate("it").unwrap())
}

pub fn other_encryption_pair() -> &'static EncryptionKeyPair {
    static PAIR: OnceLock<EncryptionKeyPair> = OnceLock::new();
    PAIR.get_or_init(|| EncryptionKeyPair::generate("it").unwrap())
}

pub fn signing_pair() -> &'static SigningKeyPair {
    static PAIR: OnceLock<SigningKeyPair> = OnceLock::new();
    PAIR.get_or_init(|| SigningKeyPair::generate("it").unwrap())
}

/// Deterministic filler that is not all one byte
pub fn patterned(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
