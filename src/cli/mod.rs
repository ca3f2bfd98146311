//! Command-line interface for the course pipeline.
//!
//! Every command is a thin wrapper over [`CoursePipeline`]: it loads the
//! configuration, opens the file store, and calls one pipeline operation.
//!
//! # Commands
//!
//! - `draft <topic>` - show the course for a topic, generating it on first use
//! - `regenerate <topic>` - throw the cached draft away and generate a new one
//! - `lecture <topic> <number>` - show one lecture, generating it on first use
//! - `status <topic>` - which lectures are ready for export
//! - `export <topic>` - write the course as a single HTML file
//! - `edit <topic>` - change the cached draft without changing its identity
//! - `discard <topic>` - remove everything cached for a topic
//! - `config` - show, create or locate the configuration file
//!
//! Lecture numbers on the command line are 1-based.
//!
//! # Global options
//!
//! - `--verbose` / `--quiet` pick the log level (`RUST_LOG` is used otherwise)
//! - `--config <path>` reads a specific configuration file
//! - `--no-progress` hides spinners

mod config;
mod course;
mod edit;
mod export;

use crate::config::MusaiConfig;
use crate::core::MusaiError;
use crate::generation::HttpGenerationService;
use crate::key::CacheKey;
use crate::pipeline::{CoursePipeline, PipelineOptions};
use crate::store::FileStore;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// The pipeline as the CLI runs it: on-disk store, HTTP service.
pub type CliPipeline = CoursePipeline<FileStore, HttpGenerationService>;

/// Settings derived from the global flags, shared by every command.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log filter; `None` defers to `RUST_LOG`, then `warn`
    pub log_level: Option<String>,
    /// Hide spinners
    pub no_progress: bool,
    /// Configuration file to read instead of the default
    pub config_path: Option<PathBuf>,
}

impl CliConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the global tracing subscriber. Later calls are no-ops.
    pub fn init_logging(&self) {
        let filter = match &self.log_level {
            Some(level) => EnvFilter::new(level),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }

    /// Whether spinners should be drawn.
    #[must_use]
    pub const fn progress_enabled(&self) -> bool {
        !self.no_progress
    }

    /// Load the configuration file this run should use.
    ///
    /// # Errors
    ///
    /// See [`MusaiConfig::load`].
    pub async fn load_settings(&self) -> Result<MusaiConfig> {
        MusaiConfig::load(self.config_path.as_deref()).await
    }

    /// Load the configuration and build a pipeline from it.
    ///
    /// # Errors
    ///
    /// Fails if the configuration is invalid or the HTTP client cannot be
    /// built.
    pub async fn pipeline(&self) -> Result<(MusaiConfig, CliPipeline)> {
        let settings = self.load_settings().await?;
        let pipeline = build_pipeline(&settings)?;
        Ok((settings, pipeline))
    }
}

/// Build a pipeline over the configured store directory and service.
///
/// # Errors
///
/// Fails if the store directory cannot be resolved or the HTTP client cannot
/// be built.
pub fn build_pipeline(settings: &MusaiConfig) -> Result<CliPipeline> {
    let store = FileStore::new(settings.store_dir()?);
    let service =
        HttpGenerationService::new(settings.service.base_url.clone(), settings.service.timeout())?
            .with_api_key(settings.service.api_key.clone());
    tracing::debug!(
        "Using store {} and service {}",
        store.root().display(),
        service.base_url()
    );
    CoursePipeline::new(store, service, PipelineOptions::from(settings))
}

/// Cache key of a topic given on the command line.
///
/// Commands that read the cache need an identity; only `draft` and
/// `regenerate` accept a blank topic.
pub(crate) fn course_key(topic: &str) -> Result<CacheKey> {
    CacheKey::normalize(topic).ok_or_else(|| MusaiError::NoIdentity.into())
}

/// Parse a 1-based lecture number.
pub(crate) fn parse_lecture_number(value: &str) -> Result<usize, String> {
    match value.trim().parse::<usize>() {
        Ok(0) => Err("lecture numbers start at 1".to_string()),
        Ok(n) => Ok(n),
        Err(_) => Err(format!("'{value}' is not a lecture number")),
    }
}

/// Musai University course pipeline.
#[derive(Parser)]
#[command(
    name = "musai",
    about = "Musai University - generate, cache and export courses",
    version,
    long_about = "Generates course drafts, lectures and images through an external service, \
                  caches every artifact locally, and exports complete courses as HTML."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the configuration file (default: ~/.musai/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Disable spinners
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the course for a topic, generating it on first use
    Draft(course::DraftCommand),

    /// Discard the cached draft and generate a new one
    Regenerate(course::RegenerateCommand),

    /// Show one lecture, generating it on first use
    Lecture(course::LectureCommand),

    /// Show which lectures are ready for export
    Status(course::StatusCommand),

    /// Export the course as a single HTML document
    Export(export::ExportCommand),

    /// Edit the cached draft
    Edit(edit::EditCommand),

    /// Remove everything cached for a topic
    Discard(course::DiscardCommand),

    /// Manage the configuration file
    Config(config::ConfigCommand),
}

impl Cli {
    /// Run the selected command.
    ///
    /// # Errors
    ///
    /// Whatever the command fails with; `main` renders it through
    /// [`crate::core::user_friendly_error`].
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    /// Settings derived from the global flags.
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            Some("error".to_string())
        } else {
            None
        };

        CliConfig {
            log_level,
            no_progress: self.no_progress,
            config_path: self.config.clone(),
        }
    }

    /// Run the selected command with explicit settings.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        config.init_logging();

        match self.command {
            Commands::Draft(cmd) => cmd.execute(&config).await,
            Commands::Regenerate(cmd) => cmd.execute(&config).await,
            Commands::Lecture(cmd) => cmd.execute(&config).await,
            Commands::Status(cmd) => cmd.execute(&config).await,
            Commands::Export(cmd) => cmd.execute(&config).await,
            Commands::Edit(cmd) => cmd.execute(&config).await,
            Commands::Discard(cmd) => cmd.execute(&config).await,
            Commands::Config(cmd) => cmd.execute(&config).await,
        }
    }
}
