//! Typed wrappers over the byte-level engines
//!
//! Values travel as JSON through serde. The type parameter of
//! [`EncryptedValue`] records what the ciphertext decrypts to; a blob decrypted
//! as the wrong shape fails with [`CryptoError::SchemaValidation`], never with
//! a cryptographic error, so callers can tell bad data from a bad key.

use crate::{
    engine::CryptoEngine,
    keys::{DecryptingKeySet, EncryptingKeySet, KeySetId, SigningKeySet, VerifyingKeySet},
    modes::{EncryptionMode, PasswordEncryptionMode, SigningMode},
    CryptoError, Result,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// Base64 hybrid or password ciphertext of a `T`
///
/// Serializes as the bare base64 string.
#[derive(Serialize, Deserialize)]
#[serde(transparent, bound = "")]
pub struct EncryptedValue<T> {
    encrypted_value: String,
    #[serde(skip)]
    _value: PhantomData<fn() -> T>,
}

impl<T> EncryptedValue<T> {
    /// Wrap base64 ciphertext that is expected to decrypt to a `T`
    pub fn new(encrypted_value: impl Into<String>) -> Self {
        Self {
            encrypted_value: encrypted_value.into(),
            _value: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.encrypted_value
    }

    pub fn into_inner(self) -> String {
        self.encrypted_value
    }

    /// Reinterpret the ciphertext as holding a `U`
    pub fn cast<U>(self) -> EncryptedValue<U> {
        EncryptedValue::new(self.encrypted_value)
    }
}

impl<T> Clone for EncryptedValue<T> {
    fn clone(&self) -> Self {
        Self::new(self.encrypted_value.clone())
    }
}

impl<T> PartialEq for EncryptedValue<T> {
    fn eq(&self, other: &Self) -> bool {
        self.encrypted_value == other.encrypted_value
    }
}

impl<T> Eq for EncryptedValue<T> {}

impl<T> fmt::Debug for EncryptedValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedValue")
            .field("type", &std::any::type_name::<T>())
            .field("len", &self.encrypted_value.len())
            .finish()
    }
}

/// A plaintext value with its detached base64 signature
///
/// `E` is the type of the extras that were bound into the signature. Extras
/// are not stored; the verifier supplies them again.
#[derive(Serialize, Deserialize)]
#[serde(bound(serialize = "T: Serialize", deserialize = "T: Deserialize<'de>"))]
pub struct SignedValue<T, E = ()> {
    pub value: T,
    pub signature: String,
    #[serde(skip)]
    _extras: PhantomData<fn() -> E>,
}

impl<T, E> SignedValue<T, E> {
    pub fn new(value: T, signature: impl Into<String>) -> Self {
        Self {
            value,
            signature: signature.into(),
            _extras: PhantomData,
        }
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

impl<T: Clone, E> Clone for SignedValue<T, E> {
    fn clone(&self) -> Self {
        Self::new(self.value.clone(), self.signature.clone())
    }
}

impl<T: PartialEq, E> PartialEq for SignedValue<T, E> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value && self.signature == other.signature
    }
}

impl<T: fmt::Debug, E> fmt::Debug for SignedValue<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedValue")
            .field("value", &self.value)
            .field("signature", &self.signature)
            .finish()
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|e| CryptoError::SchemaValidation(format!("cannot serialize value: {}", e)))
}

fn from_json<T: DeserializeOwned>(json: &str) -> Result<T> {
    serde_json::from_str(json).map_err(|e| {
        CryptoError::SchemaValidation(format!(
            "decrypted value is not a valid {}: {}",
            std::any::type_name::<T>(),
            e
        ))
    })
}

impl CryptoEngine {
    /// Serialize and encrypt a value for the holder of `keys`
    pub fn encrypt_value<T: Serialize>(
        &self,
        mode: EncryptionMode,
        value: &T,
        keys: &EncryptingKeySet,
        include_key_id: bool,
    ) -> Result<EncryptedValue<T>> {
        let json = to_json(value)?;
        let encrypted = self.encrypt_string(mode, &json, keys, include_key_id)?;
        Ok(EncryptedValue::new(encrypted))
    }

    /// Decrypt and deserialize a value
    pub fn decrypt_value<T: DeserializeOwned>(
        &self,
        encrypted: &EncryptedValue<T>,
        keys: &DecryptingKeySet,
    ) -> Result<T> {
        let json = self.decrypt_string(encrypted.as_str(), keys)?;
        from_json(&json)
    }

    /// Key-set id embedded in an encrypted value
    pub fn extract_key_id_from_encrypted_value<T>(encrypted: &EncryptedValue<T>) -> Result<KeySetId> {
        Self::extract_key_id_from_encrypted_string(encrypted.as_str())
    }

    /// Serialize and encrypt a value under a password
    pub fn encrypt_value_with_password<T: Serialize>(
        &self,
        mode: PasswordEncryptionMode,
        value: &T,
        password: &str,
    ) -> Result<EncryptedValue<T>> {
        let json = to_json(value)?;
        let encrypted = self.encrypt_string_with_password(mode, &json, password)?;
        Ok(EncryptedValue::new(encrypted))
    }

    /// Decrypt and deserialize a password-encrypted value
    pub fn decrypt_value_with_password<T: DeserializeOwned>(
        &self,
        encrypted: &EncryptedValue<T>,
        password: &str,
    ) -> Result<T> {
        let json = self.decrypt_string_with_password(encrypted.as_str(), password)?;
        from_json(&json)
    }

    /// Sign a value, keeping it in the clear next to its signature
    pub fn sign_value<T, E>(
        &self,
        mode: SigningMode,
        value: T,
        extras: Option<&E>,
        keys: &SigningKeySet,
        include_key_id: bool,
    ) -> Result<SignedValue<T, E>>
    where
        T: Serialize,
        E: Serialize,
    {
        let signature = self.generate_signature_for_value_with_extras(
            mode,
            &value,
            extras,
            keys,
            include_key_id,
        )?;
        Ok(SignedValue::new(value, signature))
    }

    /// Check a [`SignedValue`] with the same extras it was signed with
    pub fn is_signed_value_valid<T, E>(
        &self,
        signed: &SignedValue<T, E>,
        extras: Option<&E>,
        keys: &VerifyingKeySet,
    ) -> Result<bool>
    where
        T: Serialize,
        E: Serialize,
    {
        self.is_signature_valid_for_value_with_extras(&signed.signature, &signed.value, extras, keys)
    }
}
