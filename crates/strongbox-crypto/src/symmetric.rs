//! AES-256-GCM with caller-supplied IVs
//!
//! Ciphertexts carry the 16-byte GCM tag appended, as the `aead` crate emits.

use crate::{keys::AesKey, CryptoError, Result, GCM_TAG_SIZE, IV_SIZE};
use aes_gcm::aead::Aead;
use aes_gcm::Nonce;

fn nonce(iv: &[u8]) -> Result<&Nonce<aes_gcm::aead::consts::U12>> {
    if iv.len() != IV_SIZE {
        return Err(CryptoError::Format(format!(
            "IV must be {} bytes, got {}",
            IV_SIZE,
            iv.len()
        )));
    }
    Ok(Nonce::from_slice(iv))
}

/// Encrypt under the given key and IV
pub fn encrypt(key: &AesKey, iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    key.cipher()
        .encrypt(nonce(iv)?, plaintext)
        .map_err(|e| CryptoError::Encryption(format!("AES-GCM: {}", e)))
}

/// Decrypt and authenticate; a wrong key, IV or tampered body all fail here
pub fn decrypt(key: &AesKey, iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    if ciphertext.len() < GCM_TAG_SIZE {
        return Err(CryptoError::Format(format!(
            "AES-GCM ciphertext of {} bytes is shorter than its tag",
            ciphertext.len()
        )));
    }
    key.cipher()
        .decrypt(nonce(iv)?, ciphertext)
        .map_err(|e| CryptoError::Decryption(format!("AES-GCM: {}", e)))
}
