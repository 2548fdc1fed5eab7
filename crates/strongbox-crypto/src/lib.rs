//! # Strongbox Crypto
//!
//! Cryptographic envelopes for the Strongbox storage and sync layers.
//!
//! This crate provides:
//! - **Hybrid encryption**: RSA-OAEP for small payloads, RSA-wrapped
//!   AES-256-GCM envelopes for everything else
//! - **Password encryption**: PBKDF2-SHA256 derived AES-256-GCM
//! - **Signatures**: RSASSA-PKCS1-v1_5, detached or attached ("signed buffers")
//! - **Typed values**: serde-backed [`EncryptedValue`] and [`SignedValue`]
//! - **Key-pair pool**: background pre-generation of expensive RSA key pairs
//!
//! Every blob starts with a one-byte mode tag and can optionally carry the
//! producing key set's id, readable without any cryptography. See [`wire`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use strongbox_crypto::{CryptoEngine, EncryptionKeyPair, EncryptionMode};
//!
//! let engine = CryptoEngine::native();
//! let keys = EncryptionKeyPair::generate("mail")?;
//!
//! let blob = engine.encrypt_string(EncryptionMode::default(), "hello", &keys.encrypting, true)?;
//! assert_eq!(engine.decrypt_string(&blob, &keys.decrypting)?, "hello");
//! assert_eq!(&CryptoEngine::extract_key_id_from_encrypted_string(&blob)?, keys.id());
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod hybrid;
pub mod keys;
pub mod modes;
pub mod password;
pub mod pool;
pub mod primitives;
pub mod signing;
pub mod symmetric;
pub mod typed;
pub mod wire;

pub use config::{CryptoConfig, PrimitivesKind};
pub use engine::CryptoEngine;
pub use error::{CryptoError, Result};
pub use hybrid::{Ciphertext, EncryptedEnvelope};
pub use keys::{
    AesKey, DecryptingKeySet, EncryptingKeySet, EncryptionKeyPair, ExportedKeySet, KeySetId,
    KeyUsage, SigningKeyPair, SigningKeySet, VerifyingKeySet,
};
pub use modes::{EncryptionMode, PasswordEncryptionMode, SigningMode, WireMode};
pub use password::PasswordEnvelope;
pub use pool::{KeyPairPool, KeyPools};
pub use primitives::{CryptoPrimitives, MockPrimitives, NativePrimitives};
pub use signing::SignatureEnvelope;
pub use typed::{EncryptedValue, SignedValue};

/// RSA modulus size for every suite in this crate
pub const RSA_MODULUS_BITS: usize = 4096;

/// Output size of the OAEP hash (SHA-256)
pub const OAEP_HASH_SIZE: usize = 32;

/// Largest plaintext RSA-OAEP/4096/SHA-256 can encrypt directly: k - 2*hLen - 2
pub const MAX_RSA_PAYLOAD_BYTES: usize = RSA_MODULUS_BITS / 8 - 2 * OAEP_HASH_SIZE - 2;

/// AES-256 key size
pub const AES_KEY_SIZE: usize = 32;

/// AES-GCM IV size (96 bits)
pub const IV_SIZE: usize = 12;

/// AES-GCM authentication tag size
pub const GCM_TAG_SIZE: usize = 16;

/// PBKDF2 salt size
pub const SALT_SIZE: usize = 16;

/// Target size of each key-pair pool
pub const DEFAULT_POOL_SIZE: usize = 4;
