//! Primitive cryptographic operations behind the wire formats
//!
//! The engines never call RSA or AES directly; they go through a
//! [`CryptoPrimitives`] strategy injected at construction. [`NativePrimitives`]
//! is the real implementation. [`MockPrimitives`] swaps any subset of the four
//! operations for deterministic placeholders for development and tests. All
//! framing happens above this layer, so mock and real blobs share one format.

use crate::{
    keys::{AesKey, SigningKeySet, VerifyingKeySet},
    symmetric, CryptoError, Result,
};
use rand::rngs::OsRng;
use rsa::pkcs1v15;
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use std::fmt;

/// Key and parameters for an encrypt call
#[derive(Clone, Copy)]
pub enum EncryptKey<'a> {
    RsaOaep(&'a RsaPublicKey),
    AesGcm { key: &'a AesKey, iv: &'a [u8] },
}

/// Key and parameters for a decrypt call
#[derive(Clone, Copy)]
pub enum DecryptKey<'a> {
    RsaOaep(&'a RsaPrivateKey),
    AesGcm { key: &'a AesKey, iv: &'a [u8] },
}

/// The four primitive operations the engines are built on
pub trait CryptoPrimitives: Send + Sync + fmt::Debug {
    fn encrypt(&self, key: EncryptKey<'_>, plaintext: &[u8]) -> Result<Vec<u8>>;

    fn decrypt(&self, key: DecryptKey<'_>, ciphertext: &[u8]) -> Result<Vec<u8>>;

    /// Produce a raw signature over `data`
    fn sign(&self, keys: &SigningKeySet, data: &[u8]) -> Result<Vec<u8>>;

    /// Check a raw signature; a mismatch is `false`, never an error
    fn verify(&self, keys: &VerifyingKeySet, signature: &[u8], data: &[u8]) -> bool;
}

/// RSA-OAEP/SHA-256, AES-256-GCM and RSASSA-PKCS1-v1_5/SHA-256
#[derive(Clone, Copy, Debug, Default)]
pub struct NativePrimitives;

impl CryptoPrimitives for NativePrimitives {
    fn encrypt(&self, key: EncryptKey<'_>, plaintext: &[u8]) -> Result<Vec<u8>> {
        match key {
            EncryptKey::RsaOaep(public_key) => public_key
                .encrypt(&mut OsRng, Oaep::new::<Sha256>(), plaintext)
                .map_err(|e| CryptoError::Encryption(format!("RSA-OAEP: {}", e))),
            EncryptKey::AesGcm { key, iv } => symmetric::encrypt(key, iv, plaintext),
        }
    }

    fn decrypt(&self, key: DecryptKey<'_>, ciphertext: &[u8]) -> Result<Vec<u8>> {
        match key {
            DecryptKey::RsaOaep(private_key) => private_key
                .decrypt(Oaep::new::<Sha256>(), ciphertext)
                .map_err(|e| CryptoError::Decryption(format!("RSA-OAEP: {}", e))),
            DecryptKey::AesGcm { key, iv } => symmetric::decrypt(key, iv, ciphertext),
        }
    }

    fn sign(&self, keys: &SigningKeySet, data: &[u8]) -> Result<Vec<u8>> {
        let signing_key = pkcs1v15::SigningKey::<Sha256>::new(keys.private_key().clone());
        let signature = signing_key
            .try_sign(data)
            .map_err(|e| CryptoError::Signing(e.to_string()))?;
        Ok(signature.to_vec())
    }

    fn verify(&self, keys: &VerifyingKeySet, signature: &[u8], data: &[u8]) -> bool {
        let Ok(signature) = pkcs1v15::Signature::try_from(signature) else {
            return false;
        };
        pkcs1v15::VerifyingKey::<Sha256>::new(keys.public_key().clone())
            .verify(data, &signature)
            .is_ok()
    }
}

/// Prefix written by mock encryption
pub const MOCK_CIPHERTEXT_PREFIX: &[u8] = b"strongbox-mock-ciphertext:";

/// Prefix of the deterministic mock signature, followed by the key-set id
pub const MOCK_SIGNATURE_PREFIX: &str = "strongbox-mock-signature:";

/// Deterministic, insecure placeholders for development and tests
///
/// Each operation is mocked independently; the rest fall through to
/// [`NativePrimitives`]. Mock decryption strips [`MOCK_CIPHERTEXT_PREFIX`]
/// when present and otherwise decrypts for real, so mock and real data can be
/// mixed in one run.
#[derive(Clone, Copy, Debug)]
pub struct MockPrimitives {
    encrypt: bool,
    decrypt: bool,
    sign: bool,
    verify: bool,
}

impl MockPrimitives {
    /// Mock all four operations
    pub fn all() -> Self {
        Self {
            encrypt: true,
            decrypt: true,
            sign: true,
            verify: true,
        }
    }

    /// Mock nothing; every call goes to the native implementation
    pub fn none() -> Self {
        Self {
            encrypt: false,
            decrypt: false,
            sign: false,
            verify: false,
        }
    }

    pub fn with_encrypt(mut self, mock: bool) -> Self {
        self.encrypt = mock;
        self
    }

    pub fn with_decrypt(mut self, mock: bool) -> Self {
        self.decrypt = mock;
        self
    }

    pub fn with_sign(mut self, mock: bool) -> Self {
        self.sign = mock;
        self
    }

    pub fn with_verify(mut self, mock: bool) -> Self {
        self.verify = mock;
        self
    }

    fn mock_signature(keys_id: &str) -> Vec<u8> {
        format!("{}{}", MOCK_SIGNATURE_PREFIX, keys_id).into_bytes()
    }
}

impl Default for MockPrimitives {
    fn default() -> Self {
        Self::all()
    }
}

impl CryptoPrimitives for MockPrimitives {
    fn encrypt(&self, key: EncryptKey<'_>, plaintext: &[u8]) -> Result<Vec<u8>> {
        if !self.encrypt {
            return NativePrimitives.encrypt(key, plaintext);
        }
        Ok([MOCK_CIPHERTEXT_PREFIX, plaintext].concat())
    }

    fn decrypt(&self, key: DecryptKey<'_>, ciphertext: &[u8]) -> Result<Vec<u8>> {
        if self.decrypt {
            if let Some(plaintext) = ciphertext.strip_prefix(MOCK_CIPHERTEXT_PREFIX) {
                return Ok(plaintext.to_vec());
            }
        }
        NativePrimitives.decrypt(key, ciphertext)
    }

    fn sign(&self, keys: &SigningKeySet, data: &[u8]) -> Result<Vec<u8>> {
        if !self.sign {
            return NativePrimitives.sign(keys, data);
        }
        Ok(Self::mock_signature(keys.id().as_str()))
    }

    fn verify(&self, keys: &VerifyingKeySet, signature: &[u8], data: &[u8]) -> bool {
        if !self.verify {
            return NativePrimitives.verify(keys, signature, data);
        }
        signature == Self::mock_signature(keys.id().as_str()).as_slice()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{encryption_pair, signing_pair};

    #[test]
    fn test_native_rsa_oaep_roundtrip() {
        let pair = encryption_pair();
        let ct = NativePrimitives
            .encrypt(EncryptKey::RsaOaep(pair.encrypting.public_key()), b"small secret")
            .unwrap();
        assert_eq!(ct.len(), 512);
        let pt = NativePrimitives
            .decrypt(DecryptKey::RsaOaep(pair.decrypting.private_key()), &ct)
            .unwrap();
        assert_eq!(pt, b"small secret");
    }

    #[test]
    fn test_native_rsa_rejects_oversized_payload() {
        let pair = encryption_pair();
        let too_big = vec![0u8; crate::MAX_RSA_PAYLOAD_BYTES + 1];
        let err = NativePrimitives
            .encrypt(EncryptKey::RsaOaep(pair.encrypting.public_key()), &too_big)
            .unwrap_err();
        assert!(matches!(err, CryptoError::Encryption(_)));
    }

    #[test]
    fn test_native_sign_verify() {
        let pair = signing_pair();
        let sig = NativePrimitives.sign(&pair.signing, b"message").unwrap();
        assert_eq!(sig.len(), 512);
        assert!(NativePrimitives.verify(&pair.verifying, &sig, b"message"));
        assert!(!NativePrimitives.verify(&pair.verifying, &sig, b"massage"));
        assert!(!NativePrimitives.verify(&pair.verifying, b"short", b"message"));
    }

    #[test]
    fn test_mock_encrypt_is_tagged_plaintext() {
        let pair = encryption_pair();
        let ct = MockPrimitives::all()
            .encrypt(EncryptKey::RsaOaep(pair.encrypting.public_key()), b"hi")
            .unwrap();
        assert_eq!(ct, [MOCK_CIPHERTEXT_PREFIX, b"hi".as_slice()].concat());
    }

    #[test]
    fn test_mock_decrypt_falls_through_to_native() {
        let pair = encryption_pair();
        let real = NativePrimitives
            .encrypt(EncryptKey::RsaOaep(pair.encrypting.public_key()), b"real")
            .unwrap();
        let pt = MockPrimitives::all()
            .decrypt(DecryptKey::RsaOaep(pair.decrypting.private_key()), &real)
            .unwrap();
        assert_eq!(pt, b"real");
    }

    #[test]
    fn test_mock_signature_depends_on_key_id() {
        let pair = signing_pair();
        let mock = MockPrimitives::all();
        let sig = mock.sign(&pair.signing, b"anything").unwrap();
        assert_eq!(sig, format!("{}{}", MOCK_SIGNATURE_PREFIX, pair.id()).into_bytes());
        assert!(mock.verify(&pair.verifying, &sig, b"anything"));
        assert!(!mock.verify(&pair.verifying, b"strongbox-mock-signature:other", b"anything"));
    }

    #[test]
    fn test_individual_operations_swap_independently() {
        let pair = signing_pair();
        let mock = MockPrimitives::none().with_sign(true);
        let sig = mock.sign(&pair.signing, b"data").unwrap();
        // verification is still native, so the placeholder does not verify
        assert!(!mock.verify(&pair.verifying, &sig, b"data"));
        assert!(MockPrimitives::none().with_verify(true).verify(&pair.verifying, &sig, b"data"));
    }
}
