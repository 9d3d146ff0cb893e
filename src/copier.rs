//! Copying a single file into the flat target directory.
//!
//! A file is never written over different content: when the proposed name is
//! taken by other bytes, the copy lands under the first free `<stem>-N<.ext>`
//! name instead.

use crate::digest::{file_matches, ContentDigest, FileDigest};
use crate::{Error, Result};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// What happened to one source file during a pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyOutcome {
    /// Copied under its own base name
    Copied { path: PathBuf, bytes: u64 },
    /// Copied under a numbered name because the base name held other content
    Renamed { path: PathBuf, bytes: u64 },
    /// Identical content already present at `path`, nothing written
    Unchanged { path: PathBuf },
}

impl CopyOutcome {
    /// Target path the source file is now represented by
    pub fn path(&self) -> &Path {
        match self {
            CopyOutcome::Copied { path, .. }
            | CopyOutcome::Renamed { path, .. }
            | CopyOutcome::Unchanged { path } => path,
        }
    }

    pub fn bytes_written(&self) -> u64 {
        match self {
            CopyOutcome::Copied { bytes, .. } | CopyOutcome::Renamed { bytes, .. } => *bytes,
            CopyOutcome::Unchanged { .. } => 0,
        }
    }
}

/// Copy `source` to `target` and flush the destination to storage.
///
/// The destination is created or truncated. On failure a partially written
/// destination may remain.
pub fn copy_file(source: &Path, target: &Path) -> Result<u64> {
    let mut reader = File::open(source).map_err(|e| Error::io(source, e))?;
    let mut writer = File::create(target).map_err(|e| Error::io(target, e))?;

    let bytes = io::copy(&mut reader, &mut writer).map_err(|e| Error::io(target, e))?;
    writer.sync_all().map_err(|e| Error::io(target, e))?;

    Ok(bytes)
}

/// Split a file name the way `<stem>-N<.ext>` names are built: the
/// extension runs from the last `.` to the end, so `.bashrc` is all
/// extension and `archive.tar.gz` ends in `.gz`.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(dot) => name.split_at(dot),
        None => (name, ""),
    }
}

/// Candidate name `<stem>-<n><.ext>` next to `path`
fn numbered_path(path: &Path, n: u32) -> PathBuf {
    let file_name = path.file_name().unwrap_or_default();

    let name = match file_name.to_str() {
        Some(name) => {
            let (stem, ext) = split_extension(name);
            OsString::from(format!("{}-{}{}", stem, n, ext))
        }
        // Non UTF-8 names fall back to the platform's own stem/extension split
        None => {
            let mut name = path.file_stem().map(OsString::from).unwrap_or_default();
            name.push(format!("-{}", n));
            if let Some(ext) = path.extension() {
                name.push(".");
                name.push(ext);
            }
            name
        }
    };

    path.with_file_name(name)
}

/// `symlink_metadata` based probe, so a dangling link still counts as taken
fn exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Whether an existing numbered variant already holds the source content.
///
/// A variant that cannot be digested is just another taken name.
fn variant_matches(
    candidate: &Path,
    expected: &FileDigest,
    digester: &dyn ContentDigest,
) -> bool {
    if !candidate.is_file() {
        return false;
    }
    match file_matches(candidate, expected, digester) {
        Ok(same) => same,
        Err(e) => {
            debug!("Treating unreadable variant as taken: {}", e);
            false
        }
    }
}

/// Copy `source` into the target directory under `target`'s name without
/// ever overwriting different content.
///
/// - nothing at `target`: plain copy;
/// - identical content at `target` or at an existing numbered variant:
///   nothing to do;
/// - otherwise: copy under the first `<stem>-N<.ext>` (N = 1, 2, ...) that
///   does not exist on disk.
///
/// Failing to digest the source or the file at `target` aborts the copy.
/// The existence probes are only safe while no other process writes into
/// the target directory.
pub fn copy_with_unique_name(
    source: &Path,
    target: &Path,
    digester: &dyn ContentDigest,
) -> Result<CopyOutcome> {
    if !exists(target) {
        let bytes = copy_file(source, target)?;
        debug!("Copied {} -> {}", source.display(), target.display());
        return Ok(CopyOutcome::Copied {
            path: target.to_path_buf(),
            bytes,
        });
    }

    let source_digest = digester.digest_file(source)?;
    if file_matches(target, &source_digest, digester)? {
        debug!("Unchanged: {}", target.display());
        return Ok(CopyOutcome::Unchanged {
            path: target.to_path_buf(),
        });
    }

    // An earlier pass may already have stored this content under a numbered name
    let mut n = 1;
    let renamed = loop {
        let candidate = numbered_path(target, n);
        if !exists(&candidate) {
            break candidate;
        }
        if variant_matches(&candidate, &source_digest, digester) {
            debug!("Unchanged: {}", candidate.display());
            return Ok(CopyOutcome::Unchanged { path: candidate });
        }
        n += 1;
    };

    let bytes = copy_file(source, &renamed)?;
    debug!(
        "Name collision on {}, copied {} -> {}",
        target.display(),
        source.display(),
        renamed.display()
    );
    Ok(CopyOutcome::Renamed {
        path: renamed,
        bytes,
    })
}
