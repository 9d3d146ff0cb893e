//! Command-line interface for flatmirror.

use crate::config::{ErrorPolicy, PartialConfig};
use crate::digest::HashAlgorithm;
use clap::Parser;
use std::path::PathBuf;

pub mod mirror;

/// flatmirror - copy a directory tree into one flat backup directory, on a timer
#[derive(Parser, Debug)]
#[command(name = "flatmirror")]
#[command(about = "Periodically mirror a directory tree into a flat target directory")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Source directory
    #[arg(short = 's', long, value_name = "PATH")]
    pub source: Option<PathBuf>,

    /// Target directory (created if missing)
    #[arg(short = 't', long, value_name = "PATH")]
    pub target: Option<PathBuf>,

    /// Seconds between two passes [default: 3600]
    #[arg(short = 'i', long = "interval", value_name = "SECS")]
    pub interval_secs: Option<u64>,

    /// Digest used to compare a source file with an existing target file [default: blake3]
    #[arg(long, value_enum)]
    pub hash: Option<HashAlgorithm>,

    /// What a pass does when one entry fails [default: abort]
    #[arg(long = "on-error", value_enum)]
    pub on_error: Option<ErrorPolicy>,

    /// Run a single pass and exit
    #[arg(long)]
    pub once: bool,

    /// TOML file with default settings; flags override it
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Settings given as flags
    pub fn overrides(&self) -> PartialConfig {
        PartialConfig {
            source: self.source.clone(),
            target: self.target.clone(),
            interval_secs: self.interval_secs,
            hash: self.hash,
            on_error: self.on_error,
        }
    }
}
