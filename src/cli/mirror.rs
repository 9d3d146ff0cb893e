//! Mirror command implementation.

use crate::cli::Cli;
use crate::config::{MirrorConfig, PartialConfig};
use crate::scanner::BackupScanner;
use crate::scheduler::MirrorScheduler;
use anyhow::{bail, Context, Result};
use clap::error::ErrorKind;
use clap::CommandFactory;
use tracing::{info, warn};

/// Resolve configuration from the config file (if any) and the flags.
///
/// A missing source or target is reported as a [`clap::Error`] of kind
/// [`ErrorKind::MissingRequiredArgument`], carrying the usage message.
pub fn resolve_config(cli: &Cli) -> Result<MirrorConfig> {
    let base = match &cli.config {
        Some(path) => PartialConfig::load(path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?,
        None => PartialConfig::default(),
    };
    let partial = base.merge(cli.overrides());

    let missing: Vec<&str> = [
        ("-s <PATH>", partial.source.is_none()),
        ("-t <PATH>", partial.target.is_none()),
    ]
    .into_iter()
    .filter_map(|(flag, absent)| absent.then_some(flag))
    .collect();

    if !missing.is_empty() {
        let usage = Cli::command().error(
            ErrorKind::MissingRequiredArgument,
            format!("Invalid flag(s): missing {}", missing.join(", ")),
        );
        return Err(usage.into());
    }

    Ok(partial.resolve()?)
}

/// Run the mirror loop, or a single pass with `--once`
pub async fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(&cli)?;
    info!("{} --> {}", config.source.display(), config.target.display());

    let scanner = BackupScanner::new(config);

    if cli.once {
        let report = tokio::task::spawn_blocking(move || scanner.run_pass()).await??;
        if let Some(failure) = &report.aborted {
            bail!("Pass aborted: {}", failure);
        }
        info!(
            "Single pass done: {} files written, {} unchanged",
            report.files_written(),
            report.unchanged
        );
        return Ok(());
    }

    let (scheduler, handle) = MirrorScheduler::new(scanner);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, stopping after the current pass");
                handle.shutdown().await;
            }
            Err(e) => warn!("Cannot listen for Ctrl-C: {}", e),
        }
    });

    let summary = scheduler.run().await?;
    info!("Stopped after {} passes", summary.passes);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::HashAlgorithm;
    use clap::Parser;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_flags_override_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("flatmirror.toml");
        fs::write(
            &config_path,
            "source = \"/srv/data\"\ntarget = \"/srv/backup\"\ninterval_secs = 120\n",
        )
        .unwrap();

        let cli = Cli::parse_from([
            "flatmirror",
            "-c",
            config_path.to_str().unwrap(),
            "-t",
            "/mnt/usb",
            "--hash",
            "sha256",
        ]);
        let config = resolve_config(&cli).unwrap();

        assert_eq!(config.source, Path::new("/srv/data"));
        assert_eq!(config.target, Path::new("/mnt/usb"));
        assert_eq!(config.interval, Duration::from_secs(120));
        assert_eq!(config.hash, HashAlgorithm::Sha256);
    }

    fn missing_flags(args: &[&str]) -> clap::Error {
        let cli = Cli::parse_from(args.iter().copied());
        let err = resolve_config(&cli).unwrap_err();
        err.downcast::<clap::Error>()
            .expect("missing flags should be a usage error")
    }

    #[test]
    fn test_missing_source_flag() {
        let usage = missing_flags(&["flatmirror", "-t", "/backup"]);

        assert_eq!(usage.kind(), ErrorKind::MissingRequiredArgument);
        let message = usage.to_string();
        assert!(message.contains("missing -s <PATH>"));
        assert!(!message.contains("-t <PATH>"));
        assert!(message.contains("Usage:"));
    }

    #[test]
    fn test_missing_target_flag() {
        let usage = missing_flags(&["flatmirror", "-s", "/data"]);

        assert_eq!(usage.kind(), ErrorKind::MissingRequiredArgument);
        assert!(usage.to_string().contains("missing -t <PATH>"));
        assert_eq!(usage.exit_code(), 2);
    }

    #[test]
    fn test_missing_both_flags() {
        let usage = missing_flags(&["flatmirror", "--once"]);

        assert!(usage.to_string().contains("missing -s <PATH>, -t <PATH>"));
    }

    #[tokio::test]
    async fn test_run_without_flags_fails_before_any_pass() {
        let cli = Cli::parse_from(["flatmirror", "--once"]);
        let err = run(cli).await.unwrap_err();

        assert!(err.downcast_ref::<clap::Error>().is_some());
    }

    #[test]
    fn test_unreadable_config_file() {
        let cli = Cli::parse_from(["flatmirror", "-c", "/nonexistent/flatmirror.toml"]);
        let err = resolve_config(&cli).unwrap_err();
        assert!(err.to_string().contains("Failed to load config file"));
    }

    #[tokio::test]
    async fn test_single_pass() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("source");
        let target = temp_dir.path().join("target");
        fs::create_dir_all(source.join("nested")).unwrap();
        fs::write(source.join("nested").join("notes.md"), b"# notes").unwrap();

        let cli = Cli::parse_from([
            "flatmirror",
            "-s",
            source.to_str().unwrap(),
            "-t",
            target.to_str().unwrap(),
            "--once",
        ]);
        run(cli).await.unwrap();

        assert_eq!(fs::read(target.join("notes.md")).unwrap(), b"# notes");
    }

    #[tokio::test]
    async fn test_single_pass_reports_abort() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing");
        let target = temp_dir.path().join("target");

        let cli = Cli::parse_from([
            "flatmirror",
            "-s",
            missing.to_str().unwrap(),
            "-t",
            target.to_str().unwrap(),
            "--once",
        ]);
        let err = run(cli).await.unwrap_err();

        assert!(err.to_string().contains("Pass aborted"));
    }
}
