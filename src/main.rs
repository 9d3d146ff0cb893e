//! flatmirror - periodic flat directory mirror
//!
//! Main binary entry point for the command-line interface.

use clap::Parser;
use flatmirror::cli::Cli;
use std::process;
use tracing::error;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = flatmirror::logging::init_logging(cli.verbose) {
        eprintln!("{}", e);
        process::exit(1);
    }

    if let Err(e) = flatmirror::cli::mirror::run(cli).await {
        // Missing -s/-t: clap prints the usage message and exits with 2
        if let Some(usage) = e.downcast_ref::<clap::Error>() {
            usage.exit();
        }
        error!("{:#}", e);
        process::exit(1);
    }
}
