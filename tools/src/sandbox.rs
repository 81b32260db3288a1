use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use transmute_types::WriteOutcome;
use transmute_utils::{Replaced, atomic_write};

use super::{DenialReason, SandboxError};

/// Output directory that every generated file must land beneath.
///
/// The root is canonicalized once at construction; containment is checked
/// component-wise (`Path::starts_with`), so `/out` never contains `/out2/x`.
#[derive(Debug, Clone)]
pub struct OutputSandbox {
    root: PathBuf,
}

/// Validate `relative_path` and write `content` beneath `root`.
///
/// Structural rejections (empty path, `..` segments, absolute paths) happen
/// before the filesystem is consulted at all.
pub fn write(root: &Path, relative_path: &str, content: &str, reason: Option<&str>) -> WriteOutcome {
    if let Err(reason) = validate_relative(relative_path) {
        tracing::error!(path = relative_path, %reason, "Refusing unsafe file path, skipping write");
        return WriteOutcome::refused(SandboxError::Violation(reason).to_string());
    }
    match OutputSandbox::new(root) {
        Ok(sandbox) => sandbox.write(relative_path, content, reason),
        Err(e) => {
            tracing::error!(root = %root.display(), "Output directory unavailable: {e}");
            WriteOutcome::refused(e.to_string())
        }
    }
}

impl OutputSandbox {
    pub fn new(root: impl AsRef<Path>) -> Result<Self, SandboxError> {
        let root = root.as_ref();
        let canonical = fs::canonicalize(root).map_err(|source| SandboxError::RootUnavailable {
            path: root.to_path_buf(),
            source,
        })?;
        if !canonical.is_dir() {
            return Err(SandboxError::RootUnavailable {
                path: root.to_path_buf(),
                source: io::Error::new(
                    io::ErrorKind::NotADirectory,
                    "output root is not a directory",
                ),
            });
        }
        Ok(Self { root: canonical })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a model-supplied relative path to the canonical location it
    /// would be written to, without creating anything.
    pub fn resolve_for_create(&self, relative_path: &str) -> Result<PathBuf, SandboxError> {
        validate_relative(relative_path).map_err(SandboxError::Violation)?;
        let candidate = self.root.join(relative_path);
        let canonical = canonicalize_for_create(&candidate)?;
        self.check_within_root(&candidate, canonical)
    }

    /// Write `content` to `relative_path`, creating parent directories and
    /// overwriting any existing file.
    pub fn write(&self, relative_path: &str, content: &str, reason: Option<&str>) -> WriteOutcome {
        match self.try_write(relative_path, content) {
            Ok(resolved) => {
                tracing::info!(path = %resolved.display(), "Successfully wrote file");
                if let Some(reason) = reason.filter(|r| !r.trim().is_empty()) {
                    tracing::info!(path = %resolved.display(), reason, "Write reason");
                }
                WriteOutcome::written(resolved)
            }
            Err(e) => {
                tracing::error!(path = relative_path, "Error writing file: {e}");
                match &e {
                    SandboxError::Filesystem { path, .. } => {
                        WriteOutcome::failed_at(path.clone(), e.to_string())
                    }
                    _ => WriteOutcome::refused(e.to_string()),
                }
            }
        }
    }

    fn try_write(&self, relative_path: &str, content: &str) -> Result<PathBuf, SandboxError> {
        let target = self.resolve_for_create(relative_path)?;
        if target.is_dir() {
            return Err(SandboxError::Filesystem {
                path: target,
                source: io::Error::new(
                    io::ErrorKind::IsADirectory,
                    "target is an existing directory",
                ),
            });
        }
        let parent = target.parent().ok_or_else(|| {
            SandboxError::Violation(DenialReason::PathEscapesSandbox {
                attempted: PathBuf::from(relative_path),
                resolved: target.clone(),
            })
        })?;

        fs::create_dir_all(parent).map_err(|source| SandboxError::Filesystem {
            path: parent.to_path_buf(),
            source,
        })?;
        self.validate_created_parent(&target)?;

        let replaced = atomic_write(&target, content.as_bytes()).map_err(|source| {
            SandboxError::Filesystem {
                path: target.clone(),
                source,
            }
        })?;
        if replaced == Replaced::Overwritten {
            tracing::debug!(path = %target.display(), "Overwrote existing file");
        }
        Ok(target)
    }

    fn check_within_root(&self, attempted: &Path, canonical: PathBuf) -> Result<PathBuf, SandboxError> {
        if canonical.starts_with(&self.root) && canonical != self.root {
            Ok(canonical)
        } else {
            Err(SandboxError::Violation(DenialReason::PathEscapesSandbox {
                attempted: attempted.to_path_buf(),
                resolved: canonical,
            }))
        }
    }

    /// Post-creation re-check: after `create_dir_all`, the parent must still
    /// canonicalize inside the root and no directory between the root and the
    /// target may be a symlink.
    fn validate_created_parent(&self, target: &Path) -> Result<(), SandboxError> {
        let Some(parent) = target.parent() else {
            return Ok(());
        };

        let mut current = parent.to_path_buf();
        while current.starts_with(&self.root) && current != self.root {
            if let Ok(meta) = fs::symlink_metadata(&current)
                && meta.file_type().is_symlink()
            {
                return Err(SandboxError::Violation(DenialReason::SymlinkInPath {
                    attempted: target.to_path_buf(),
                    link: current,
                }));
            }
            match current.parent() {
                Some(p) => current = p.to_path_buf(),
                None => break,
            }
        }

        let canonical = fs::canonicalize(parent).map_err(|source| SandboxError::Filesystem {
            path: parent.to_path_buf(),
            source,
        })?;
        if canonical.starts_with(&self.root) {
            Ok(())
        } else {
            Err(SandboxError::Violation(DenialReason::PathEscapesSandbox {
                attempted: target.to_path_buf(),
                resolved: canonical,
            }))
        }
    }
}

/// Structural checks that need no filesystem access.
fn validate_relative(relative_path: &str) -> Result<(), DenialReason> {
    if relative_path.trim().is_empty() {
        return Err(DenialReason::EmptyPath);
    }
    if relative_path.chars().any(char::is_control) {
        return Err(DenialReason::UnsafeCharacters {
            attempted: relative_path.to_string(),
        });
    }
    let attempted = PathBuf::from(relative_path);
    // Backslash-separated `..` counts too.
    if attempted
        .components()
        .any(|c| matches!(c, Component::ParentDir))
        || relative_path.split(['/', '\\']).any(|segment| segment == "..")
    {
        return Err(DenialReason::ParentTraversal { attempted });
    }
    if attempted.is_absolute() || attempted.has_root() {
        return Err(DenialReason::AbsolutePath { attempted });
    }
    Ok(())
}

/// Canonicalize for creation: walk up to the nearest existing ancestor.
fn canonicalize_for_create(resolved: &Path) -> Result<PathBuf, SandboxError> {
    let escape = || {
        SandboxError::Violation(DenialReason::PathEscapesSandbox {
            attempted: resolved.to_path_buf(),
            resolved: resolved.to_path_buf(),
        })
    };

    if resolved.exists() {
        return fs::canonicalize(resolved).map_err(|_| escape());
    }

    let mut existing_ancestor = resolved.parent();
    let mut non_existent_parts: Vec<&OsStr> = Vec::new();

    if let Some(file_name) = resolved.file_name() {
        non_existent_parts.push(file_name);
    }

    while let Some(ancestor) = existing_ancestor {
        if ancestor.exists() {
            break;
        }
        if let Some(dir_name) = ancestor.file_name() {
            non_existent_parts.push(dir_name);
        }
        existing_ancestor = ancestor.parent();
    }

    let existing = existing_ancestor.ok_or_else(escape)?;
    let mut result = fs::canonicalize(existing).map_err(|_| escape())?;

    // Rejoin non-existent parts in reverse order (they were collected bottom-up)
    for part in non_existent_parts.into_iter().rev() {
        result = result.join(part);
    }
    Ok(result)
}
