//! `musai` entry point.
//!
//! Parses arguments, runs the command, and renders failures with suggestions.

use anyhow::Result;
use clap::Parser;
use musai_course::cli;
use musai_course::core::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
