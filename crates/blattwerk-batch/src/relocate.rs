// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Worksheet relocation: move a processed worksheet next to its outputs.
//
// A plain rename is tried first. When that is impossible (another
// filesystem, for instance) the file is copied, the copy is checked against
// the source by SHA-256, and only then is the source removed.

use std::fs;
use std::path::{Path, PathBuf};

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_document::write_atomic;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

/// Compute the SHA-256 hash of `data` and return it as a lowercase hex string.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    hex::encode(result)
}

/// Verify that `data` matches the expected SHA-256 hex digest.
pub fn verify_hash(data: &[u8], expected_hex: &str) -> Result<()> {
    let actual = hash_bytes(data);
    if actual == expected_hex {
        Ok(())
    } else {
        Err(BlattwerkError::Relocation(format!(
            "copy does not match source (expected {expected_hex}, got {actual})"
        )))
    }
}

/// Move `source` into `dest_dir`, keeping its file name. Returns the new path.
///
/// An existing file of the same name in `dest_dir` is never replaced.
#[instrument(skip_all, fields(path = %source.display(), dest = %dest_dir.display()))]
pub fn relocate(source: &Path, dest_dir: &Path) -> Result<PathBuf> {
    let file_name = source.file_name().ok_or_else(|| {
        BlattwerkError::Relocation(format!("{} has no file name", source.display()))
    })?;
    let target = dest_dir.join(file_name);
    if target.exists() {
        return Err(BlattwerkError::Relocation(format!(
            "{} already exists",
            target.display()
        )));
    }

    match fs::rename(source, &target) {
        Ok(()) => debug!("Worksheet renamed"),
        Err(err) => {
            warn!(%err, "Rename failed, copying instead");
            copy_verified(source, &target)?;
            fs::remove_file(source).map_err(|err| {
                BlattwerkError::Relocation(format!(
                    "copied to {} but could not remove {}: {}",
                    target.display(),
                    source.display(),
                    err
                ))
            })?;
        }
    }

    info!(target = %target.display(), "Worksheet relocated");
    Ok(target)
}

/// Copy `source` to `target` and check the copy byte for byte by digest.
/// On mismatch the copy is removed and the source left alone.
fn copy_verified(source: &Path, target: &Path) -> Result<()> {
    let relocation_error = |action: &str, path: &Path, err: &dyn std::fmt::Display| {
        BlattwerkError::Relocation(format!("failed to {action} {}: {}", path.display(), err))
    };

    let data = fs::read(source).map_err(|err| relocation_error("read", source, &err))?;
    let expected = hash_bytes(&data);
    write_atomic(target, &data).map_err(|err| relocation_error("write", target, &err))?;

    let copied = fs::read(target).map_err(|err| relocation_error("read back", target, &err))?;
    if let Err(err) = verify_hash(&copied, &expected) {
        let _ = fs::remove_file(target);
        return Err(err);
    }
    debug!(sha256 = %expected, "Copy verified");
    Ok(())
}
