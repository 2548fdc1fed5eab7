//! JSON key files
//!
//! A key file is an [`ExportedKeySet`] serialized as JSON. Private key files
//! are created owner-readable only on Unix, and existing key files are
//! never overwritten.

use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use strongbox_crypto::{ExportedKeySet, KeyUsage};

/// Paths of the two files `keygen` writes for an output prefix
pub fn key_file_paths(prefix: &Path) -> (PathBuf, PathBuf) {
    let with_suffix = |suffix: &str| {
        let mut name = prefix.as_os_str().to_owned();
        name.push(suffix);
        PathBuf::from(name)
    };
    (with_suffix(".public.json"), with_suffix(".private.json"))
}

/// Write a key file, refusing to replace one that already exists
///
/// Private key files are created with mode `0600`, so their contents are never
/// readable by other users.
pub fn write_key_file(path: &Path, key: &ExportedKeySet) -> Result<()> {
    let json = serde_json::to_string_pretty(key)?;
    let private = matches!(key.usage, KeyUsage::Decrypt | KeyUsage::Sign);
    let mut file = create_key_file(path, private)
        .with_context(|| format!("creating key file {}", path.display()))?;
    file.write_all(json.as_bytes())
        .with_context(|| format!("writing key file {}", path.display()))?;
    tracing::debug!(path = %path.display(), key_set = %key.id, usage = ?key.usage, "wrote key file");
    Ok(())
}

#[cfg(unix)]
fn create_key_file(path: &Path, private: bool) -> std::io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    if private {
        options.mode(0o600);
    }
    options.open(path)
}

#[cfg(not(unix))]
fn create_key_file(path: &Path, _private: bool) -> std::io::Result<File> {
    OpenOptions::new().write(true).create_new(true).open(path)
}

pub fn read_key_file(path: &Path) -> Result<ExportedKeySet> {
    let json =
        fs::read_to_string(path).with_context(|| format!("reading key file {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("parsing key file {}", path.display()))
}
