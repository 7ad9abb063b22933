//! Encrypted-at-rest credential store.
//!
//! This module provides:
//! - `SecretCipher`: passphrase-derived key sealing individual secrets
//! - `ConfigStore`: load/save contract the session layer depends on
//! - `FileConfigStore`: `setup.json` in the config directory
//!
//! Only secrets are encrypted; URLs and flags stay readable so the file
//! can be inspected by hand.

pub mod cipher;
pub mod setup;

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

pub use cipher::{CryptoError, SecretCipher};
pub use setup::{ConfigStore, FileConfigStore, StoreError};

/// Replace `path` with `contents` so readers see either the old or the
/// new file, never a partial one. Each writer gets its own temp file.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut temp = NamedTempFile::new_in(parent)?;
    temp.as_file_mut().write_all(contents.as_bytes())?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
