//! # flatmirror
//!
//! Periodic directory mirror into a single flat target directory.
//!
//! Each pass walks the source tree and copies every regular file into the
//! target directory under its base name. Existing target files are never
//! overwritten: a file whose name is taken by identical content is skipped,
//! a file whose name is taken by different content is stored as
//! `<stem>-N<.ext>` with the smallest free `N`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use flatmirror::{BackupScanner, MirrorConfig};
//! use std::path::Path;
//!
//! # fn main() -> flatmirror::Result<()> {
//! let config = MirrorConfig::new(Path::new("./my-data"), Path::new("./flat-backup"));
//! let report = BackupScanner::new(config).run_pass()?;
//! println!("{} files written", report.files_written());
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod copier;
pub mod digest;
pub mod error;
pub mod logging;
pub mod scanner;
pub mod scheduler;

// Re-export commonly used types
pub use config::{ErrorPolicy, MirrorConfig};
pub use copier::CopyOutcome;
pub use digest::{ContentDigest, HashAlgorithm};
pub use error::{Error, Result};
pub use scanner::{BackupScanner, PassReport};
pub use scheduler::{MirrorScheduler, SchedulerHandle};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
