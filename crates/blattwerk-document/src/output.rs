// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Atomic output writes: bytes go to a temporary file in the destination
// folder, which is renamed over the final name only once it is complete.

use std::io::Write;
use std::path::Path;

use blattwerk_core::error::{BlattwerkError, Result};
use tempfile::NamedTempFile;
use tracing::{debug, instrument};

/// Write `bytes` to `path` so readers see either nothing or the whole file.
/// An existing file at `path` is replaced.
#[instrument(skip_all, fields(path = %path.display(), bytes = bytes.len()))]
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let write_error = |err: &dyn std::fmt::Display| {
        BlattwerkError::OutputWrite(format!("failed to write {}: {}", path.display(), err))
    };

    let mut temp = NamedTempFile::new_in(dir).map_err(|err| write_error(&err))?;
    temp.write_all(bytes).map_err(|err| write_error(&err))?;
    temp.as_file().sync_all().map_err(|err| write_error(&err))?;
    temp.persist(path).map_err(|err| write_error(&err.error))?;

    debug!("Output written");
    Ok(())
}
