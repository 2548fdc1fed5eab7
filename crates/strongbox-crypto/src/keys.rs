//! Key sets for the envelope engines
//!
//! A key set pairs RSA key material with a stable [`KeySetId`]. The id is
//! what gets embedded in blobs so a reader can tell which key produced (or can
//! open) a blob without running any cryptography.
//!
//! - Encryption: [`EncryptingKeySet`] (public) / [`DecryptingKeySet`] (private)
//! - Signatures: [`SigningKeySet`] (private) / [`VerifyingKeySet`] (public)

use crate::{CryptoError, Result, AES_KEY_SIZE, IV_SIZE, OAEP_HASH_SIZE, RSA_MODULUS_BITS};
use aes_gcm::{Aes256Gcm, KeyInit};
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Maximum namespace length in a key-set id
pub const MAX_NAMESPACE_LEN: usize = 64;

/// Identifier of a key set: `<namespace>.<uuid-v4>`
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeySetId(String);

impl KeySetId {
    /// Mint a fresh id under the given namespace
    pub fn generate(namespace: &str) -> Result<Self> {
        validate_namespace(namespace)?;
        Ok(Self(format!("{}.{}", namespace, uuid::Uuid::new_v4().hyphenated())))
    }

    /// The namespace part
    pub fn namespace(&self) -> &str {
        self.0.rsplit_once('.').map(|(ns, _)| ns).unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn validate_namespace(namespace: &str) -> Result<()> {
    let valid_chars = namespace
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');
    if namespace.is_empty() || namespace.len() > MAX_NAMESPACE_LEN || !valid_chars {
        return Err(CryptoError::InvalidKey(format!(
            "invalid key-set namespace {:?}",
            namespace
        )));
    }
    Ok(())
}

impl FromStr for KeySetId {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self> {
        let (namespace, uuid_part) = s
            .rsplit_once('.')
            .ok_or_else(|| CryptoError::InvalidKey(format!("malformed key-set id {:?}", s)))?;
        validate_namespace(namespace)?;
        let uuid = uuid::Uuid::parse_str(uuid_part)
            .map_err(|e| CryptoError::InvalidKey(format!("malformed key-set id {:?}: {}", s, e)))?;
        if uuid.hyphenated().to_string() != uuid_part {
            return Err(CryptoError::InvalidKey(format!(
                "key-set id {:?} is not in canonical form",
                s
            )));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for KeySetId {
    type Error = CryptoError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<KeySetId> for String {
    fn from(id: KeySetId) -> Self {
        id.0
    }
}

impl fmt::Display for KeySetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for KeySetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeySetId({})", self.0)
    }
}

/// A freshly generated AES-256 key: raw exportable bytes plus the ready cipher
pub struct AesKey {
    raw: RawAesKey,
    cipher: Aes256Gcm,
}

#[derive(Zeroize, ZeroizeOnDrop)]
struct RawAesKey([u8; AES_KEY_SIZE]);

impl AesKey {
    /// Generate a new random key
    pub fn generate() -> Self {
        let mut bytes = [0u8; AES_KEY_SIZE];
        OsRng.fill_bytes(&mut bytes);
        let key = Self::from_array(bytes);
        bytes.zeroize();
        key
    }

    /// Import raw key bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; AES_KEY_SIZE] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidKey(format!(
                "AES key must be {} bytes, got {}",
                AES_KEY_SIZE,
                bytes.len()
            ))
        })?;
        Ok(Self::from_array(arr))
    }

    fn from_array(bytes: [u8; AES_KEY_SIZE]) -> Self {
        let cipher = Aes256Gcm::new(&bytes.into());
        Self { raw: RawAesKey(bytes), cipher }
    }

    /// The raw key bytes
    pub fn as_bytes(&self) -> &[u8; AES_KEY_SIZE] {
        &self.raw.0
    }

    /// The initialised cipher handle
    pub fn cipher(&self) -> &Aes256Gcm {
        &self.cipher
    }
}

impl fmt::Debug for AesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AesKey(..)")
    }
}

/// Public half of an encryption key pair
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptingKeySet {
    id: KeySetId,
    public_key: RsaPublicKey,
}

impl EncryptingKeySet {
    pub fn new(id: KeySetId, public_key: RsaPublicKey) -> Self {
        Self { id, public_key }
    }

    pub fn id(&self) -> &KeySetId {
        &self.id
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    /// A fresh random IV; every call draws from the OS RNG
    pub fn next_iv(&self) -> [u8; IV_SIZE] {
        let mut iv = [0u8; IV_SIZE];
        OsRng.fill_bytes(&mut iv);
        iv
    }

    /// A fresh ephemeral AES-256 key; every call draws from the OS RNG
    pub fn raw_aes_key(&self) -> AesKey {
        AesKey::generate()
    }

    /// Largest plaintext that can be RSA-OAEP encrypted directly
    pub fn max_direct_payload(&self) -> usize {
        max_oaep_payload(&self.public_key)
    }
}

impl fmt::Debug for EncryptingKeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptingKeySet").field("id", &self.id).finish_non_exhaustive()
    }
}

/// Private half of an encryption key pair
#[derive(Clone)]
pub struct DecryptingKeySet {
    id: KeySetId,
    private_key: RsaPrivateKey,
}

impl DecryptingKeySet {
    pub fn new(id: KeySetId, private_key: RsaPrivateKey) -> Self {
        Self { id, private_key }
    }

    pub fn id(&self) -> &KeySetId {
        &self.id
    }

    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }

    /// Derive the matching encrypting key set
    pub fn encrypting_key_set(&self) -> EncryptingKeySet {
        EncryptingKeySet::new(self.id.clone(), self.private_key.to_public_key())
    }
}

impl fmt::Debug for DecryptingKeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecryptingKeySet").field("id", &self.id).finish_non_exhaustive()
    }
}

/// Private half of a signing key pair
#[derive(Clone)]
pub struct SigningKeySet {
    id: KeySetId,
    private_key: RsaPrivateKey,
}

impl SigningKeySet {
    pub fn new(id: KeySetId, private_key: RsaPrivateKey) -> Self {
        Self { id, private_key }
    }

    pub fn id(&self) -> &KeySetId {
        &self.id
    }

    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }

    /// Derive the matching verifying key set
    pub fn verifying_key_set(&self) -> VerifyingKeySet {
        VerifyingKeySet::new(self.id.clone(), self.private_key.to_public_key())
    }
}

impl fmt::Debug for SigningKeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKeySet").field("id", &self.id).finish_non_exhaustive()
    }
}

/// Public half of a signing key pair
#[derive(Clone, PartialEq, Eq)]
pub struct VerifyingKeySet {
    id: KeySetId,
    public_key: RsaPublicKey,
}

impl VerifyingKeySet {
    pub fn new(id: KeySetId, public_key: RsaPublicKey) -> Self {
        Self { id, public_key }
    }

    pub fn id(&self) -> &KeySetId {
        &self.id
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }
}

impl fmt::Debug for VerifyingKeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifyingKeySet").field("id", &self.id).finish_non_exhaustive()
    }
}

fn max_oaep_payload(key: &RsaPublicKey) -> usize {
    key.size().saturating_sub(2 * OAEP_HASH_SIZE + 2)
}

fn generate_rsa_key() -> Result<RsaPrivateKey> {
    RsaPrivateKey::new(&mut OsRng, RSA_MODULUS_BITS)
        .map_err(|e| CryptoError::KeyGeneration(e.to_string()))
}

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| CryptoError::KeyGeneration(format!("generation task failed: {}", e)))?
}

/// A matched encrypting/decrypting key-set pair
#[derive(Clone, Debug)]
pub struct EncryptionKeyPair {
    pub encrypting: EncryptingKeySet,
    pub decrypting: DecryptingKeySet,
}

impl EncryptionKeyPair {
    /// Generate a 4096-bit pair (CPU heavy, blocks the calling thread)
    pub fn generate(namespace: &str) -> Result<Self> {
        let id = KeySetId::generate(namespace)?;
        let private_key = generate_rsa_key()?;
        Ok(Self::from_private_key(id, private_key))
    }

    /// Generate on the blocking thread pool
    pub async fn generate_async(namespace: impl Into<String>) -> Result<Self> {
        let namespace = namespace.into();
        run_blocking(move || Self::generate(&namespace)).await
    }

    pub fn from_private_key(id: KeySetId, private_key: RsaPrivateKey) -> Self {
        let decrypting = DecryptingKeySet::new(id, private_key);
        Self {
            encrypting: decrypting.encrypting_key_set(),
            decrypting,
        }
    }

    pub fn id(&self) -> &KeySetId {
        self.decrypting.id()
    }
}

/// A matched signing/verifying key-set pair
#[derive(Clone, Debug)]
pub struct SigningKeyPair {
    pub signing: SigningKeySet,
    pub verifying: VerifyingKeySet,
}

impl SigningKeyPair {
    /// Generate a 4096-bit pair (CPU heavy, blocks the calling thread)
    pub fn generate(namespace: &str) -> Result<Self> {
        let id = KeySetId::generate(namespace)?;
        let private_key = generate_rsa_key()?;
        Ok(Self::from_private_key(id, private_key))
    }

    /// Generate on the blocking thread pool
    pub async fn generate_async(namespace: impl Into<String>) -> Result<Self> {
        let namespace = namespace.into();
        run_blocking(move || Self::generate(&namespace)).await
    }

    pub fn from_private_key(id: KeySetId, private_key: RsaPrivateKey) -> Self {
        let signing = SigningKeySet::new(id, private_key);
        Self {
            verifying: signing.verifying_key_set(),
            signing,
        }
    }

    pub fn id(&self) -> &KeySetId {
        self.signing.id()
    }
}

/// What an exported key set may be used for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyUsage {
    Encrypt,
    Decrypt,
    Sign,
    Verify,
}

/// Portable form of a key set: id, usage, and base64 DER key material
/// (SPKI for public keys, PKCS#8 for private keys)
#[derive(Clone, Serialize, Deserialize)]
pub struct ExportedKeySet {
    pub id: KeySetId,
    pub usage: KeyUsage,
    pub der: String,
}

impl fmt::Debug for ExportedKeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportedKeySet")
            .field("id", &self.id)
            .field("usage", &self.usage)
            .finish_non_exhaustive()
    }
}

impl ExportedKeySet {
    fn public(id: &KeySetId, usage: KeyUsage, key: &RsaPublicKey) -> Result<Self> {
        let der = key
            .to_public_key_der()
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        Ok(Self {
            id: id.clone(),
            usage,
            der: base64::engine::general_purpose::STANDARD.encode(der.as_bytes()),
        })
    }

    fn private(id: &KeySetId, usage: KeyUsage, key: &RsaPrivateKey) -> Result<Self> {
        let der = key
            .to_pkcs8_der()
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        Ok(Self {
            id: id.clone(),
            usage,
            der: base64::engine::general_purpose::STANDARD.encode(der.as_bytes()),
        })
    }

    fn expect_usage(&self, usage: KeyUsage) -> Result<()> {
        if self.usage != usage {
            return Err(CryptoError::InvalidKey(format!(
                "key set {} is for {:?}, not {:?}",
                self.id, self.usage, usage
            )));
        }
        Ok(())
    }

    fn public_key(&self, usage: KeyUsage) -> Result<RsaPublicKey> {
        self.expect_usage(usage)?;
        let der = base64::engine::general_purpose::STANDARD.decode(&self.der)?;
        RsaPublicKey::from_public_key_der(&der).map_err(|e| CryptoError::InvalidKey(e.to_string()))
    }

    fn private_key(&self, usage: KeyUsage) -> Result<RsaPrivateKey> {
        self.expect_usage(usage)?;
        let mut der = base64::engine::general_purpose::STANDARD.decode(&self.der)?;
        let key = RsaPrivateKey::from_pkcs8_der(&der)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()));
        der.zeroize();
        key
    }
}

impl EncryptingKeySet {
    pub fn export(&self) -> Result<ExportedKeySet> {
        ExportedKeySet::public(&self.id, KeyUsage::Encrypt, &self.public_key)
    }

    pub fn import(exported: &ExportedKeySet) -> Result<Self> {
        Ok(Self::new(exported.id.clone(), exported.public_key(KeyUsage::Encrypt)?))
    }
}

impl DecryptingKeySet {
    pub fn export(&self) -> Result<ExportedKeySet> {
        ExportedKeySet::private(&self.id, KeyUsage::Decrypt, &self.private_key)
    }

    pub fn import(exported: &ExportedKeySet) -> Result<Self> {
        Ok(Self::new(exported.id.clone(), exported.private_key(KeyUsage::Decrypt)?))
    }
}

impl SigningKeySet {
    pub fn export(&self) -> Result<ExportedKeySet> {
        ExportedKeySet::private(&self.id, KeyUsage::Sign, &self.private_key)
    }

    pub fn import(exported: &ExportedKeySet) -> Result<Self> {
        Ok(Self::new(exported.id.clone(), exported.private_key(KeyUsage::Sign)?))
    }
}

impl VerifyingKeySet {
    pub fn export(&self) -> Result<ExportedKeySet> {
        ExportedKeySet::public(&self.id, KeyUsage::Verify, &self.public_key)
    }

    pub fn import(exported: &ExportedKeySet) -> Result<Self> {
        Ok(Self::new(exported.id.clone(), exported.public_key(KeyUsage::Verify)?))
    }
}
