//! Backup scanner: one full pass over the source tree.
//!
//! Every regular file found below the source root is handed to
//! [`copy_with_unique_name`] under its base name in the flat target
//! directory. Subdirectory structure is not reproduced, so equal base names
//! from different directories meet in the target and are told apart by the
//! numbered-name rule.

use crate::config::{ErrorPolicy, MirrorConfig};
use crate::copier::{copy_with_unique_name, CopyOutcome};
use crate::digest::ContentDigest;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::ops::ControlFlow;
use std::path::PathBuf;
use tracing::{debug, info, span, warn, Level};
use walkdir::{DirEntry, WalkDir};

/// A source entry that could not be mirrored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFailure {
    /// Source path, when the walk could tell which entry failed
    pub path: Option<PathBuf>,
    pub error: String,
}

impl std::fmt::Display for EntryFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}: {}", path.display(), self.error),
            None => write!(f, "{}", self.error),
        }
    }
}

/// Summary of a single pass
#[derive(Debug, Clone)]
pub struct PassReport {
    pub started: DateTime<Utc>,
    pub finished: DateTime<Utc>,
    /// Files the copier finished with: copied, renamed or unchanged.
    /// Entries that failed are only counted in `failures`/`aborted`.
    pub files_seen: usize,
    pub copied: usize,
    pub renamed: usize,
    pub unchanged: usize,
    pub bytes_copied: u64,
    /// Failures skipped over under [`ErrorPolicy::Continue`]
    pub failures: Vec<EntryFailure>,
    /// Failure that ended the pass early under [`ErrorPolicy::Abort`]
    pub aborted: Option<EntryFailure>,
}

impl PassReport {
    fn begin() -> Self {
        let now = Utc::now();
        Self {
            started: now,
            finished: now,
            files_seen: 0,
            copied: 0,
            renamed: 0,
            unchanged: 0,
            bytes_copied: 0,
            failures: Vec::new(),
            aborted: None,
        }
    }

    fn record(&mut self, outcome: &CopyOutcome) {
        match outcome {
            CopyOutcome::Copied { .. } => self.copied += 1,
            CopyOutcome::Renamed { .. } => self.renamed += 1,
            CopyOutcome::Unchanged { .. } => self.unchanged += 1,
        }
        self.bytes_copied += outcome.bytes_written();
    }

    /// Whether the pass visited the whole tree
    pub fn is_complete(&self) -> bool {
        self.aborted.is_none()
    }

    /// Whether the pass visited the whole tree without a single failure
    pub fn is_clean(&self) -> bool {
        self.is_complete() && self.failures.is_empty()
    }

    /// Files written during the pass
    pub fn files_written(&self) -> usize {
        self.copied + self.renamed
    }
}

/// Walks the source tree and mirrors it into the flat target directory
pub struct BackupScanner {
    config: MirrorConfig,
    digester: Box<dyn ContentDigest>,
}

impl BackupScanner {
    /// Scanner using the digest algorithm named in `config`
    pub fn new(config: MirrorConfig) -> Self {
        let digester = config.hash.digester();
        Self { config, digester }
    }

    /// Scanner with a caller supplied digest implementation
    pub fn with_digester(config: MirrorConfig, digester: Box<dyn ContentDigest>) -> Self {
        Self { config, digester }
    }

    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    /// Run one pass.
    ///
    /// Only a failure to create the target root is returned as an error; it
    /// is fatal for the process. Walk and per-file failures end up in the
    /// report, handled according to the configured [`ErrorPolicy`].
    pub fn run_pass(&self) -> Result<PassReport> {
        let span = span!(Level::INFO, "pass", source = %self.config.source.display());
        let _enter = span.enter();

        let target_root = &self.config.target;
        fs::create_dir_all(target_root).map_err(|source| Error::TargetRoot {
            path: target_root.clone(),
            source,
        })?;

        debug!(
            "Scanning {} into {} ({})",
            self.config.source.display(),
            target_root.display(),
            self.digester.name()
        );

        let mut report = PassReport::begin();

        let walker = WalkDir::new(&self.config.source)
            .follow_links(false)
            .sort_by_file_name();

        for entry in walker {
            let result = match entry {
                Ok(entry) if entry.file_type().is_dir() => continue,
                Ok(entry) => self
                    .mirror_entry(&entry)
                    .map_err(|e| (Some(entry.path().to_path_buf()), e)),
                Err(e) => Err((e.path().map(|p| p.to_path_buf()), Error::Walk(e))),
            };

            match result {
                Ok(Some(outcome)) => {
                    report.files_seen += 1;
                    report.record(&outcome);
                }
                Ok(None) => {}
                Err((path, error)) => {
                    let failure = EntryFailure {
                        path,
                        error: error.to_string(),
                    };
                    if self.handle_failure(&mut report, failure).is_break() {
                        break;
                    }
                }
            }
        }

        report.finished = Utc::now();
        if report.is_complete() {
            info!(
                "Pass complete: {} copied, {} renamed, {} unchanged, {} bytes written",
                report.copied, report.renamed, report.unchanged, report.bytes_copied
            );
        }

        Ok(report)
    }

    fn handle_failure(&self, report: &mut PassReport, failure: EntryFailure) -> ControlFlow<()> {
        match self.config.on_error {
            ErrorPolicy::Abort => {
                warn!("Pass aborted at {}", failure);
                report.aborted = Some(failure);
                ControlFlow::Break(())
            }
            ErrorPolicy::Continue => {
                warn!("Skipping entry: {}", failure);
                report.failures.push(failure);
                ControlFlow::Continue(())
            }
        }
    }

    /// Mirror one non-directory entry; `None` when the entry is not a file
    fn mirror_entry(&self, entry: &DirEntry) -> Result<Option<CopyOutcome>> {
        let path = entry.path();
        let file_type = entry.file_type();

        if file_type.is_symlink() {
            // Follow the link for content; a dangling link is an error
            let metadata = fs::metadata(path).map_err(|e| Error::io(path, e))?;
            if !metadata.is_file() {
                debug!("Skipping link to non-file: {}", path.display());
                return Ok(None);
            }
        } else if !file_type.is_file() {
            debug!("Skipping special file: {}", path.display());
            return Ok(None);
        }

        let target = self.config.target.join(entry.file_name());
        copy_with_unique_name(path, &target, self.digester.as_ref()).map(Some)
    }
}
