//! Command implementations
//!
//! Each command takes already-read input and returns what the binary prints,
//! so the binary stays a thin layer over stdin/stdout.

use crate::keyfile::{key_file_paths, read_key_file, write_key_file};
use anyhow::{Context, Result};
use base64::Engine;
use clap::ValueEnum;
use std::path::{Path, PathBuf};
use strongbox_crypto::{
    CryptoEngine, DecryptingKeySet, EncryptingKeySet, EncryptionKeyPair, EncryptionMode, KeySetId,
    PasswordEncryptionMode, SigningKeyPair, SigningKeySet, SigningMode, VerifyingKeySet,
};

/// Which kind of key pair to generate
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum KeyKind {
    Encryption,
    Signing,
}

/// Which blob format a key id is read from
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum BlobKind {
    Encrypted,
    Signature,
}

/// Generate a key pair and write `<prefix>.public.json` and `<prefix>.private.json`
pub async fn keygen(kind: KeyKind, namespace: &str, prefix: &Path) -> Result<(PathBuf, PathBuf)> {
    let (public_path, private_path) = key_file_paths(prefix);
    let (public, private) = match kind {
        KeyKind::Encryption => {
            let pair = EncryptionKeyPair::generate_async(namespace).await?;
            (pair.encrypting.export()?, pair.decrypting.export()?)
        }
        KeyKind::Signing => {
            let pair = SigningKeyPair::generate_async(namespace).await?;
            (pair.verifying.export()?, pair.signing.export()?)
        }
    };
    write_key_file(&public_path, &public)?;
    write_key_file(&private_path, &private)?;
    tracing::info!(key_set = %public.id, "generated {:?} key pair", kind);
    Ok((public_path, private_path))
}

pub fn encrypt(
    engine: &CryptoEngine,
    key_path: &Path,
    plaintext: &[u8],
    with_key_id: bool,
) -> Result<String> {
    let keys = EncryptingKeySet::import(&read_key_file(key_path)?)
        .context("key file does not hold a public encryption key")?;
    let blob = engine.encrypt_buffer(EncryptionMode::default(), plaintext, &keys, with_key_id)?;
    Ok(base64_encode(&blob))
}

pub fn decrypt(engine: &CryptoEngine, key_path: &Path, blob: &str) -> Result<Vec<u8>> {
    let keys = DecryptingKeySet::import(&read_key_file(key_path)?)
        .context("key file does not hold a private decryption key")?;
    let blob = base64_decode(blob)?;
    Ok(engine.decrypt_buffer(&blob, &keys)?)
}

pub fn encrypt_with_password(
    engine: &CryptoEngine,
    password: &str,
    plaintext: &[u8],
) -> Result<String> {
    let blob =
        engine.encrypt_buffer_with_password(PasswordEncryptionMode::default(), plaintext, password)?;
    Ok(base64_encode(&blob))
}

pub fn decrypt_with_password(engine: &CryptoEngine, password: &str, blob: &str) -> Result<Vec<u8>> {
    let blob = base64_decode(blob)?;
    Ok(engine.decrypt_buffer_with_password(&blob, password)?)
}

pub fn sign(
    engine: &CryptoEngine,
    key_path: &Path,
    data: &[u8],
    with_key_id: bool,
) -> Result<String> {
    let keys = SigningKeySet::import(&read_key_file(key_path)?)
        .context("key file does not hold a private signing key")?;
    let signature =
        engine.generate_signature_for_buffer(SigningMode::default(), data, &keys, with_key_id)?;
    Ok(base64_encode(&signature))
}

/// `Ok(false)` for a signature that does not match; errors only for unusable input
pub fn verify(
    engine: &CryptoEngine,
    key_path: &Path,
    data: &[u8],
    signature: &str,
) -> Result<bool> {
    let keys = VerifyingKeySet::import(&read_key_file(key_path)?)
        .context("key file does not hold a public verifying key")?;
    let signature = base64_decode(signature)?;
    Ok(engine.is_signature_valid_for_buffer(&signature, data, &keys))
}

pub fn key_id(kind: BlobKind, blob: &str) -> Result<KeySetId> {
    let blob = base64_decode(blob)?;
    let id = match kind {
        BlobKind::Encrypted => CryptoEngine::extract_key_id_from_encrypted_buffer(&blob)?,
        BlobKind::Signature => CryptoEngine::extract_key_id_from_signature(&blob)?,
    };
    Ok(id)
}

fn base64_encode(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

fn base64_decode(text: &str) -> Result<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(text.trim())
        .context("input is not base64")
}
