//! RSASSA-PKCS1-v1_5 signatures
//!
//! Two containers share one signature format:
//!
//! ```text
//! signature:     mode(1) · hasKeyId(1) · [keyIdLen(4) · keyId] · rawSignature
//! signed buffer: sigLen(4) · signature · value
//! ```
//!
//! Verification never errors on a bad or unparseable signature; it answers
//! `false`. Only serialization of a typed value can fail, and that failure is
//! a schema-validation error.

use crate::{
    engine::CryptoEngine,
    keys::{KeySetId, SigningKeySet, VerifyingKeySet},
    modes::SigningMode,
    wire::{KeyIdSection, WireReader, WireWriter},
    CryptoError, Result,
};
use base64::Engine;
use serde::Serialize;

/// A parsed signature blob
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignatureEnvelope {
    pub mode: SigningMode,
    pub key_id: KeyIdSection,
    pub signature: Vec<u8>,
}

impl SignatureEnvelope {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut w = WireWriter::with_capacity(6 + self.signature.len());
        w.put_mode(self.mode);
        w.put_key_id_section(&self.key_id)?;
        w.put_raw(&self.signature);
        Ok(w.finish())
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = WireReader::new(bytes);
        Ok(Self {
            mode: r.read_mode()?,
            key_id: r.read_key_id_section()?,
            signature: r.read_rest().to_vec(),
        })
    }

    /// Read only the mode and key-id section
    pub fn peek_key_id(bytes: &[u8]) -> Result<KeySetId> {
        let mut r = WireReader::new(bytes);
        r.read_mode::<SigningMode>()
            .and_then(|_| r.read_key_id_section())
            .map_err(|e| CryptoError::NotFound(format!("no readable key-set id: {}", e)))?
            .into_key_id()
    }
}

/// Split a signed buffer into its signature blob and value
pub fn split_signed_buffer(signed: &[u8]) -> Result<(&[u8], &[u8])> {
    let mut r = WireReader::new(signed);
    let signature = r.read_length_prefixed("signature")?;
    Ok((signature, r.read_rest()))
}

/// JSON bytes covered by a value signature
///
/// With extras, the signed document is `{"value": .., "extras": ..}`. Going
/// through `serde_json::Value` sorts map keys, so maps sign identically
/// regardless of iteration order.
fn value_signing_payload<T, E>(value: &T, extras: Option<&E>) -> Result<Vec<u8>>
where
    T: Serialize + ?Sized,
    E: Serialize + ?Sized,
{
    let value = serde_json::to_value(value)?;
    let document = match extras {
        Some(extras) => serde_json::json!({
            "value": value,
            "extras": serde_json::to_value(extras)?,
        }),
        None => value,
    };
    Ok(serde_json::to_vec(&document)?)
}

impl CryptoEngine {
    /// Sign a buffer, returning a detached signature blob
    pub fn generate_signature_for_buffer(
        &self,
        mode: SigningMode,
        data: &[u8],
        keys: &SigningKeySet,
        include_key_id: bool,
    ) -> Result<Vec<u8>> {
        let signature = match mode {
            SigningMode::RsassaPkcs1v15Sha256 => self.primitives().sign(keys, data)?,
        };
        tracing::debug!(
            key_set = %keys.id(),
            mode = %mode,
            len = data.len(),
            include_key_id,
            "signed buffer"
        );
        SignatureEnvelope {
            mode,
            key_id: KeyIdSection::from_key_id(include_key_id.then(|| keys.id())),
            signature,
        }
        .encode()
    }

    /// Check a detached signature blob against `data`
    pub fn is_signature_valid_for_buffer(
        &self,
        signature: &[u8],
        data: &[u8],
        keys: &VerifyingKeySet,
    ) -> bool {
        let envelope = match SignatureEnvelope::decode(signature) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::debug!(key_set = %keys.id(), error = %e, "unreadable signature");
                return false;
            }
        };
        match envelope.mode {
            SigningMode::RsassaPkcs1v15Sha256 => {
                self.primitives().verify(keys, &envelope.signature, data)
            }
        }
    }

    /// Sign a buffer and prepend the signature: `sigLen · signature · data`
    pub fn generate_signed_buffer(
        &self,
        mode: SigningMode,
        data: &[u8],
        keys: &SigningKeySet,
        include_key_id: bool,
    ) -> Result<Vec<u8>> {
        let signature = self.generate_signature_for_buffer(mode, data, keys, include_key_id)?;
        let mut w = WireWriter::with_capacity(4 + signature.len() + data.len());
        w.put_length_prefixed(&signature)?;
        w.put_raw(data);
        Ok(w.finish())
    }

    /// The value carried by a signed buffer, without verifying it
    pub fn extract_value_from_signed_buffer(signed: &[u8]) -> Result<&[u8]> {
        split_signed_buffer(signed).map(|(_, value)| value)
    }

    /// Verify a signed buffer's attached signature against its own value
    pub fn is_signature_valid_for_signed_buffer(&self, signed: &[u8], keys: &VerifyingKeySet) -> bool {
        match split_signed_buffer(signed) {
            Ok((signature, value)) => self.is_signature_valid_for_buffer(signature, value, keys),
            Err(e) => {
                tracing::debug!(key_set = %keys.id(), error = %e, "unreadable signed buffer");
                false
            }
        }
    }

    /// Key-set id embedded in a signature blob
    pub fn extract_key_id_from_signature(signature: &[u8]) -> Result<KeySetId> {
        SignatureEnvelope::peek_key_id(signature)
    }

    /// Key-set id embedded in a signed buffer's signature
    pub fn extract_key_id_from_signed_buffer(signed: &[u8]) -> Result<KeySetId> {
        let (signature, _) = split_signed_buffer(signed)
            .map_err(|e| CryptoError::NotFound(format!("no readable key-set id: {}", e)))?;
        Self::extract_key_id_from_signature(signature)
    }

    /// Sign the JSON form of a value; returns the signature blob as base64
    pub fn generate_signature_for_value<T>(
        &self,
        mode: SigningMode,
        value: &T,
        keys: &SigningKeySet,
        include_key_id: bool,
    ) -> Result<String>
    where
        T: Serialize + ?Sized,
    {
        self.generate_signature_for_value_with_extras::<T, ()>(mode, value, None, keys, include_key_id)
    }

    /// Sign a value together with extras that are bound into the signature
    /// but not carried alongside the value
    pub fn generate_signature_for_value_with_extras<T, E>(
        &self,
        mode: SigningMode,
        value: &T,
        extras: Option<&E>,
        keys: &SigningKeySet,
        include_key_id: bool,
    ) -> Result<String>
    where
        T: Serialize + ?Sized,
        E: Serialize + ?Sized,
    {
        let payload = value_signing_payload(value, extras)?;
        let signature = self.generate_signature_for_buffer(mode, &payload, keys, include_key_id)?;
        Ok(base64::engine::general_purpose::STANDARD.encode(signature))
    }

    /// Check a base64 signature from [`CryptoEngine::generate_signature_for_value`]
    pub fn is_signature_valid_for_value<T>(
        &self,
        signature: &str,
        value: &T,
        keys: &VerifyingKeySet,
    ) -> Result<bool>
    where
        T: Serialize + ?Sized,
    {
        self.is_signature_valid_for_value_with_extras::<T, ()>(signature, value, None, keys)
    }

    /// Check a value signature; `extras` must match what was signed exactly,
    /// including whether any were supplied at all
    pub fn is_signature_valid_for_value_with_extras<T, E>(
        &self,
        signature: &str,
        value: &T,
        extras: Option<&E>,
        keys: &VerifyingKeySet,
    ) -> Result<bool>
    where
        T: Serialize + ?Sized,
        E: Serialize + ?Sized,
    {
        let payload = value_signing_payload(value, extras)?;
        let Ok(signature) = base64::engine::general_purpose::STANDARD.decode(signature) else {
            tracing::debug!(key_set = %keys.id(), "signature is not base64");
            return Ok(false);
        };
        Ok(self.is_signature_valid_for_buffer(&signature, &payload, keys))
    }
}
