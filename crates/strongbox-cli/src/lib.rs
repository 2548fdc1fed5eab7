//! # Strongbox CLI
//!
//! Scriptable access to Strongbox envelopes.
//!
//! This crate provides:
//! - **Key files**: JSON-exported RSA key sets, written by `keygen`
//! - **Commands**: hybrid and password encryption, signatures, key-id lookup
//!
//! Blobs cross the command line as base64 text.

pub mod commands;
pub mod keyfile;

pub use commands::{BlobKind, KeyKind};

use strongbox_crypto::{CryptoConfig, CryptoEngine};

/// Build the engine, optionally over mock primitives
pub fn build_engine(mock_crypto: bool) -> CryptoEngine {
    let config = if mock_crypto {
        CryptoConfig::default().with_mock_primitives()
    } else {
        CryptoConfig::default()
    };
    config.build_engine()
}
