//! Whole-file replacement for generated output.
//!
//! Content goes to a temp file in the destination directory and is renamed
//! over the target, so a half-written translation is never visible under its
//! final name. Rename-over-existing fails on Windows; there the old file is
//! moved aside first and restored if the second rename also fails.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// What a successful write did to the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Replaced {
    Created,
    Overwritten,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtomicWriteOptions {
    /// fsync the temp file before it is renamed into place.
    pub sync: bool,
    /// Carry the Unix permission bits of an overwritten file over to the new one.
    pub keep_mode: bool,
}

impl Default for AtomicWriteOptions {
    fn default() -> Self {
        Self {
            sync: true,
            keep_mode: true,
        }
    }
}

pub fn atomic_write(path: impl AsRef<Path>, bytes: &[u8]) -> io::Result<Replaced> {
    atomic_write_with_options(path, bytes, AtomicWriteOptions::default())
}

pub fn atomic_write_with_options(
    path: impl AsRef<Path>,
    bytes: &[u8],
    options: AtomicWriteOptions,
) -> io::Result<Replaced> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let existing = fs::metadata(path).ok();
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    if options.sync {
        tmp.as_file().sync_all()?;
    }

    if let Err(err) = tmp.persist(path) {
        if existing.is_none() {
            return Err(err.error);
        }
        let aside = path.with_extension("transmute-old");
        let _ = fs::remove_file(&aside);
        fs::rename(path, &aside)?;
        if let Err(retry) = err.file.persist(path) {
            let _ = fs::rename(&aside, path);
            return Err(retry.error);
        }
        if let Err(e) = fs::remove_file(&aside) {
            tracing::warn!(path = %aside.display(), "Failed to remove replaced file: {e}");
        }
    }

    let Some(meta) = existing else {
        return Ok(Replaced::Created);
    };
    #[cfg(unix)]
    if options.keep_mode {
        use std::os::unix::fs::PermissionsExt;
        let mode = meta.permissions().mode() & 0o7777;
        fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    }
    #[cfg(not(unix))]
    let _ = meta;
    Ok(Replaced::Overwritten)
}
