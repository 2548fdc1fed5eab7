//! Password-based encryption
//!
//! A 256-bit AES key is derived with PBKDF2-HMAC-SHA256 from the password and
//! a random 16-byte salt; the payload is AES-256-GCM encrypted under a random
//! 12-byte IV. The round count belongs to the mode, so a blob stays
//! decryptable for as long as its mode tag is supported.
//!
//! ```text
//! mode(1) · ivLen(4) · iv · saltLen(4) · salt · ctLen(4) · ciphertext
//! ```

use crate::{
    engine::CryptoEngine,
    keys::AesKey,
    modes::PasswordEncryptionMode,
    primitives::{DecryptKey, EncryptKey},
    wire::{WireReader, WireWriter},
    CryptoError, Result, AES_KEY_SIZE, IV_SIZE, SALT_SIZE,
};
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroizing;

/// A parsed password-encrypted blob
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PasswordEnvelope {
    pub mode: PasswordEncryptionMode,
    pub iv: Vec<u8>,
    pub salt: Vec<u8>,
    pub ciphertext: Vec<u8>,
}

impl PasswordEnvelope {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut w = WireWriter::with_capacity(
            1 + 12 + self.iv.len() + self.salt.len() + self.ciphertext.len(),
        );
        w.put_mode(self.mode);
        w.put_length_prefixed(&self.iv)?;
        w.put_length_prefixed(&self.salt)?;
        w.put_length_prefixed(&self.ciphertext)?;
        Ok(w.finish())
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = WireReader::new(bytes);
        let envelope = Self {
            mode: r.read_mode()?,
            iv: r.read_length_prefixed("IV")?.to_vec(),
            salt: r.read_length_prefixed("salt")?.to_vec(),
            ciphertext: r.read_length_prefixed("ciphertext")?.to_vec(),
        };
        if r.remaining() != 0 {
            return Err(CryptoError::Format(format!(
                "{} trailing bytes after password ciphertext",
                r.remaining()
            )));
        }
        Ok(envelope)
    }
}

/// Derive the AES key for a password and salt under the given mode
pub fn derive_key(mode: PasswordEncryptionMode, password: &str, salt: &[u8]) -> Result<AesKey> {
    let mut key = Zeroizing::new([0u8; AES_KEY_SIZE]);
    match mode {
        PasswordEncryptionMode::Pbkdf2Sha256Aes256Gcm => {
            pbkdf2::pbkdf2_hmac::<Sha256>(
                password.as_bytes(),
                salt,
                mode.iterations(),
                &mut key[..],
            );
        }
    }
    AesKey::from_bytes(&key[..])
}

impl CryptoEngine {
    /// Encrypt a buffer under a password
    pub fn encrypt_buffer_with_password(
        &self,
        mode: PasswordEncryptionMode,
        plaintext: &[u8],
        password: &str,
    ) -> Result<Vec<u8>> {
        let mut salt = [0u8; SALT_SIZE];
        OsRng.fill_bytes(&mut salt);
        let mut iv = [0u8; IV_SIZE];
        OsRng.fill_bytes(&mut iv);

        let key = derive_key(mode, password, &salt)?;
        let ciphertext = self
            .primitives()
            .encrypt(EncryptKey::AesGcm { key: &key, iv: &iv }, plaintext)?;
        tracing::debug!(mode = %mode, len = plaintext.len(), "password-encrypted buffer");

        PasswordEnvelope {
            mode,
            iv: iv.to_vec(),
            salt: salt.to_vec(),
            ciphertext,
        }
        .encode()
    }

    /// Decrypt a password-encrypted buffer
    ///
    /// A wrong password fails GCM authentication and is reported as a
    /// decryption error.
    pub fn decrypt_buffer_with_password(&self, encrypted: &[u8], password: &str) -> Result<Vec<u8>> {
        let envelope = PasswordEnvelope::decode(encrypted)?;
        let key = derive_key(envelope.mode, password, &envelope.salt)?;
        self.primitives().decrypt(
            DecryptKey::AesGcm {
                key: &key,
                iv: &envelope.iv,
            },
            &envelope.ciphertext,
        )
    }

    /// Encrypt UTF-8 text under a password, to base64
    pub fn encrypt_string_with_password(
        &self,
        mode: PasswordEncryptionMode,
        plaintext: &str,
        password: &str,
    ) -> Result<String> {
        let encrypted = self.encrypt_buffer_with_password(mode, plaintext.as_bytes(), password)?;
        Ok(base64::engine::general_purpose::STANDARD.encode(encrypted))
    }

    /// Decrypt base64 produced by [`CryptoEngine::encrypt_string_with_password`]
    pub fn decrypt_string_with_password(&self, encrypted: &str, password: &str) -> Result<String> {
        let bytes = base64::engine::general_purpose::STANDARD.decode(encrypted)?;
        Ok(String::from_utf8(self.decrypt_buffer_with_password(&bytes, password)?)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_roundtrip_and_layout() {
        let engine = CryptoEngine::native();
        let encrypted = engine
            .encrypt_buffer_with_password(PasswordEncryptionMode::default(), b"diary entry", "hunter2")
            .unwrap();

        let envelope = PasswordEnvelope::decode(&encrypted).unwrap();
        assert_eq!(encrypted[0], 1);
        assert_eq!(&encrypted[1..5], &[0, 0, 0, IV_SIZE as u8]);
        assert_eq!(envelope.iv.len(), IV_SIZE);
        assert_eq!(envelope.salt.len(), SALT_SIZE);
        assert_eq!(envelope.ciphertext.len(), 11 + crate::GCM_TAG_SIZE);

        let decrypted = engine.decrypt_buffer_with_password(&encrypted, "hunter2").unwrap();
        assert_eq!(decrypted, b"diary entry");
    }

    #[test]
    fn test_wrong_password_is_decryption_failure() {
        let engine = CryptoEngine::native();
        let encrypted = engine
            .encrypt_string_with_password(PasswordEncryptionMode::default(), "secret", "right")
            .unwrap();
        let err = engine.decrypt_string_with_password(&encrypted, "wrong").unwrap_err();
        assert!(matches!(err, CryptoError::Decryption(_)));
    }

    #[test]
    fn test_key_derivation_is_deterministic_per_salt() {
        let mode = PasswordEncryptionMode::default();
        let a = derive_key(mode, "pw", b"salt-salt-salt-1").unwrap();
        let b = derive_key(mode, "pw", b"salt-salt-salt-1").unwrap();
        let c = derive_key(mode, "pw", b"salt-salt-salt-2").unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
        assert_ne!(a.as_bytes(), c.as_bytes());
    }

    #[test]
    fn test_format_errors() {
        let engine = CryptoEngine::native();
        assert!(engine.decrypt_buffer_with_password(&[], "pw").unwrap_err().is_format());
        assert!(engine.decrypt_buffer_with_password(&[2, 0, 0, 0, 0], "pw").unwrap_err().is_format());
        assert!(engine
            .decrypt_buffer_with_password(&[1, 0, 0, 0, 12, 1, 2], "pw")
            .unwrap_err()
            .is_format());
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let envelope = PasswordEnvelope {
            mode: PasswordEncryptionMode::default(),
            iv: vec![0; IV_SIZE],
            salt: vec![1; SALT_SIZE],
            ciphertext: vec![2; 20],
        };
        let mut bytes = envelope.encode().unwrap();
        assert_eq!(PasswordEnvelope::decode(&bytes).unwrap(), envelope);
        bytes.push(0);
        assert!(PasswordEnvelope::decode(&bytes).unwrap_err().is_format());
    }
}
