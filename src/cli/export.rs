//! `musai export`: write a course as one HTML file.

use super::{CliConfig, course_key};
use crate::pipeline::ExportMode;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

/// Export the course as a single HTML document.
///
/// Refuses while any lecture is missing or below the content floor, unless
/// `--force` is given. Export only reads the cache; run `musai lecture` for
/// each missing lecture first.
#[derive(Args)]
pub struct ExportCommand {
    /// Free-text course topic
    topic: String,

    /// Export whatever is cached, skipping missing lectures
    #[arg(long)]
    force: bool,

    /// Output directory (default: `export.output_dir`, then the current
    /// directory)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl ExportCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let key = course_key(&self.topic)?;
        let (settings, pipeline) = config.pipeline().await?;

        let mode = if self.force {
            ExportMode::Forced
        } else {
            ExportMode::Gated
        };
        let document = pipeline.export(&key, mode).await?;
        let total = pipeline.draft(&key).await?.syllabus.len();

        let dir = self
            .output
            .or(settings.export.output_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        let path = document.write_to(&dir)?;

        println!(
            "✅ Exported {} of {} lectures to {}",
            document.section_count,
            total,
            path.display().to_string().green()
        );
        if document.section_count < total {
            let skipped = total - document.section_count;
            println!(
                "{}",
                format!("   {skipped} lecture(s) were not cached and were left out").yellow()
            );
        }
        Ok(())
    }
}
