//! Hybrid RSA-OAEP / AES-256-GCM encryption
//!
//! Small payloads are RSA-OAEP encrypted directly ("single stage"). Empty
//! payloads and payloads above the OAEP bound use an envelope ("two stage"):
//! a fresh IV and a fresh AES-256 key are minted for the message, each is
//! RSA-OAEP encrypted on its own, and the payload is AES-256-GCM encrypted.
//!
//! ```text
//! mode(1) · hasKeyId(1) · [keyIdLen(4) · keyId] · complexity(1) · body
//!   complexity 1: body = rsaCiphertext
//!   complexity 2: body = ivLen(4) · encIv · keyLen(4) · encAesKey · gcmCiphertext
//! ```

use crate::{
    engine::CryptoEngine,
    keys::{AesKey, DecryptingKeySet, EncryptingKeySet, KeySetId},
    modes::EncryptionMode,
    primitives::{DecryptKey, EncryptKey},
    wire::{KeyIdSection, WireReader, WireWriter},
    CryptoError, Result, MAX_RSA_PAYLOAD_BYTES,
};
use base64::Engine;
use zeroize::Zeroizing;

const COMPLEXITY_DIRECT: u8 = 1;
const COMPLEXITY_ENVELOPED: u8 = 2;

/// Body of a hybrid-encrypted blob
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Ciphertext {
    /// Payload RSA-OAEP encrypted directly
    Direct(Vec<u8>),
    /// Payload AES-GCM encrypted under a per-message key
    Enveloped {
        /// RSA-OAEP encrypted IV
        encrypted_iv: Vec<u8>,
        /// RSA-OAEP encrypted raw AES key
        encrypted_key: Vec<u8>,
        /// AES-GCM ciphertext, tag appended
        body: Vec<u8>,
    },
}

impl Ciphertext {
    /// The complexity tag written on the wire
    pub fn complexity(&self) -> u8 {
        match self {
            Self::Direct(_) => COMPLEXITY_DIRECT,
            Self::Enveloped { .. } => COMPLEXITY_ENVELOPED,
        }
    }
}

/// A parsed hybrid-encrypted blob
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncryptedEnvelope {
    pub mode: EncryptionMode,
    pub key_id: KeyIdSection,
    pub ciphertext: Ciphertext,
}

impl EncryptedEnvelope {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut w = WireWriter::new();
        w.put_mode(self.mode);
        w.put_key_id_section(&self.key_id)?;
        w.put_u8(self.ciphertext.complexity());
        match &self.ciphertext {
            Ciphertext::Direct(ct) => w.put_raw(ct),
            Ciphertext::Enveloped {
                encrypted_iv,
                encrypted_key,
                body,
            } => {
                w.put_length_prefixed(encrypted_iv)?;
                w.put_length_prefixed(encrypted_key)?;
                w.put_raw(body);
            }
        }
        Ok(w.finish())
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = WireReader::new(bytes);
        let mode = r.read_mode::<EncryptionMode>()?;
        let key_id = r.read_key_id_section()?;
        let ciphertext = match r.read_u8("complexity")? {
            COMPLEXITY_DIRECT => Ciphertext::Direct(r.read_rest().to_vec()),
            COMPLEXITY_ENVELOPED => Ciphertext::Enveloped {
                encrypted_iv: r.read_length_prefixed("encrypted IV")?.to_vec(),
                encrypted_key: r.read_length_prefixed("encrypted AES key")?.to_vec(),
                body: r.read_rest().to_vec(),
            },
            other => {
                return Err(CryptoError::Format(format!(
                    "unknown encryption complexity {}",
                    other
                )))
            }
        };
        Ok(Self {
            mode,
            key_id,
            ciphertext,
        })
    }

    /// Read only the mode and key-id section
    pub fn peek_key_id(bytes: &[u8]) -> Result<KeySetId> {
        let mut r = WireReader::new(bytes);
        r.read_mode::<EncryptionMode>()
            .and_then(|_| r.read_key_id_section())
            .map_err(|e| CryptoError::NotFound(format!("no readable key-set id: {}", e)))?
            .into_key_id()
    }
}

impl CryptoEngine {
    /// Encrypt a buffer for the holder of `keys`
    pub fn encrypt_buffer(
        &self,
        mode: EncryptionMode,
        plaintext: &[u8],
        keys: &EncryptingKeySet,
        include_key_id: bool,
    ) -> Result<Vec<u8>> {
        let ciphertext = match mode {
            EncryptionMode::RsaOaep4096Aes256Gcm => self.rsa_aes_encrypt(plaintext, keys)?,
        };
        tracing::debug!(
            key_set = %keys.id(),
            complexity = ciphertext.complexity(),
            len = plaintext.len(),
            include_key_id,
            "encrypted buffer"
        );
        EncryptedEnvelope {
            mode,
            key_id: KeyIdSection::from_key_id(include_key_id.then(|| keys.id())),
            ciphertext,
        }
        .encode()
    }

    fn rsa_aes_encrypt(&self, plaintext: &[u8], keys: &EncryptingKeySet) -> Result<Ciphertext> {
        let public_key = keys.public_key();
        let limit = keys.max_direct_payload().min(MAX_RSA_PAYLOAD_BYTES);
        // Empty input always goes through the envelope; some OAEP
        // implementations reject zero-length messages.
        if !plaintext.is_empty() && plaintext.len() <= limit {
            let ct = self
                .primitives()
                .encrypt(EncryptKey::RsaOaep(public_key), plaintext)?;
            return Ok(Ciphertext::Direct(ct));
        }

        let iv = keys.next_iv();
        let aes_key = keys.raw_aes_key();
        let primitives = self.primitives();
        let encrypted_iv = primitives.encrypt(EncryptKey::RsaOaep(public_key), &iv)?;
        let encrypted_key = primitives.encrypt(EncryptKey::RsaOaep(public_key), aes_key.as_bytes())?;
        let body = primitives.encrypt(
            EncryptKey::AesGcm {
                key: &aes_key,
                iv: &iv,
            },
            plaintext,
        )?;
        Ok(Ciphertext::Enveloped {
            encrypted_iv,
            encrypted_key,
            body,
        })
    }

    /// Decrypt a blob produced by [`CryptoEngine::encrypt_buffer`]
    pub fn decrypt_buffer(&self, encrypted: &[u8], keys: &DecryptingKeySet) -> Result<Vec<u8>> {
        let envelope = EncryptedEnvelope::decode(encrypted)?;
        let private_key = keys.private_key();
        let primitives = self.primitives();
        match (envelope.mode, envelope.ciphertext) {
            (EncryptionMode::RsaOaep4096Aes256Gcm, Ciphertext::Direct(ct)) => {
                primitives.decrypt(DecryptKey::RsaOaep(private_key), &ct)
            }
            (
                EncryptionMode::RsaOaep4096Aes256Gcm,
                Ciphertext::Enveloped {
                    encrypted_iv,
                    encrypted_key,
                    body,
                },
            ) => {
                let iv = Zeroizing::new(
                    primitives.decrypt(DecryptKey::RsaOaep(private_key), &encrypted_iv)?,
                );
                let raw_key = Zeroizing::new(
                    primitives.decrypt(DecryptKey::RsaOaep(private_key), &encrypted_key)?,
                );
                let aes_key = AesKey::from_bytes(&raw_key)
                    .map_err(|e| CryptoError::Decryption(e.to_string()))?;
                primitives.decrypt(
                    DecryptKey::AesGcm {
                        key: &aes_key,
                        iv: iv.as_slice(),
                    },
                    &body,
                )
            }
        }
    }

    /// Encrypt UTF-8 text to base64
    pub fn encrypt_string(
        &self,
        mode: EncryptionMode,
        plaintext: &str,
        keys: &EncryptingKeySet,
        include_key_id: bool,
    ) -> Result<String> {
        let encrypted = self.encrypt_buffer(mode, plaintext.as_bytes(), keys, include_key_id)?;
        Ok(base64::engine::general_purpose::STANDARD.encode(encrypted))
    }

    /// Decrypt base64 produced by [`CryptoEngine::encrypt_string`]
    pub fn decrypt_string(&self, encrypted: &str, keys: &DecryptingKeySet) -> Result<String> {
        let bytes = base64::engine::general_purpose::STANDARD.decode(encrypted)?;
        Ok(String::from_utf8(self.decrypt_buffer(&bytes, keys)?)?)
    }

    /// Key-set id embedded in an encrypted buffer, without decrypting
    pub fn extract_key_id_from_encrypted_buffer(encrypted: &[u8]) -> Result<KeySetId> {
        EncryptedEnvelope::peek_key_id(encrypted)
    }

    /// Key-set id embedded in an encrypted base64 string, without decrypting
    pub fn extract_key_id_from_encrypted_string(encrypted: &str) -> Result<KeySetId> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encrypted)
            .map_err(|e| CryptoError::NotFound(format!("no readable key-set id: {}", e)))?;
        Self::extract_key_id_from_encrypted_buffer(&bytes)
    }
}
