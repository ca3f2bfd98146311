//! `musai config`: show, create or locate the configuration file.
//!
//! ```bash
//! musai config          # same as `config show`
//! musai config init     # write a default file
//! musai config path     # print where the file lives
//! ```

use super::CliConfig;
use crate::config::MusaiConfig;
use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;
use std::path::Path;

/// Manage the configuration file.
#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: Option<ConfigSubcommands>,
}

#[derive(Subcommand)]
enum ConfigSubcommands {
    /// Show the effective configuration, API key masked
    Show,

    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the configuration file location
    Path,
}

impl ConfigCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let path = match &config.config_path {
            Some(path) => path.clone(),
            None => MusaiConfig::default_path()?,
        };

        match self.command {
            Some(ConfigSubcommands::Show) | None => Self::show(config, &path).await,
            Some(ConfigSubcommands::Init {
                force,
            }) => Self::init(&path, force).await,
            Some(ConfigSubcommands::Path) => {
                println!("{}", path.display());
                Ok(())
            }
        }
    }

    async fn show(config: &CliConfig, path: &Path) -> Result<()> {
        let mut settings = config.load_settings().await?;
        settings.service.api_key = settings.service.api_key.as_deref().map(mask_secret);

        println!("{}", "Configuration".bold());
        if path.exists() {
            println!("Location: {}", path.display());
        } else {
            println!("Location: {} {}", path.display(), "(not created, using defaults)".dimmed());
        }
        println!("Store: {}\n", settings.store_dir()?.display());
        println!("{}", toml::to_string_pretty(&settings)?);

        if !path.exists() {
            println!("{}", "Tip:".yellow());
            println!("  Run 'musai config init' to create the file");
        }
        Ok(())
    }

    async fn init(path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            println!("❌ Config already exists at: {}", path.display());
            println!("   Use --force to overwrite");
            return Ok(());
        }

        let settings = MusaiConfig::default();
        settings.save_to(path).await?;

        println!("✅ Created config at: {}", path.display());
        println!("\n{}", toml::to_string_pretty(&settings)?);
        println!("{}", "Next steps:".yellow());
        println!("  1. Point service.base_url at your generation service");
        println!("  2. Set service.api_key, or export MUSAI_API_KEY");
        Ok(())
    }
}

/// Keep the first four characters of a secret.
fn mask_secret(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    if secret.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("{visible}****")
    }
}
