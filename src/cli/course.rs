//! Commands that open, inspect and discard a course.

use super::{CliConfig, course_key, parse_lecture_number};
use crate::completeness::{ExportReadiness, LectureStatus, plain_text};
use crate::course::{CourseDraft, LectureArtifact};
use crate::generation::ViewGuard;
use crate::pipeline::CourseView;
use crate::utils::Spinner;
use anyhow::Result;
use clap::Args;
use colored::Colorize;

/// Show the course for a topic.
#[derive(Args)]
pub struct DraftCommand {
    /// Free-text course topic
    topic: String,
}

impl DraftCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let (_, pipeline) = config.pipeline().await?;
        let guard = ViewGuard::new();

        let spinner = Spinner::start(
            format!("Preparing course for '{}'", self.topic.trim()),
            config.progress_enabled(),
        );
        let view = pipeline.open_course(&self.topic, &guard).await;
        spinner.finish_and_clear();

        print_course(&view?);
        Ok(())
    }
}

/// Discard the cached draft and generate a new one.
#[derive(Args)]
pub struct RegenerateCommand {
    /// Free-text course topic
    topic: String,
}

impl RegenerateCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let (_, pipeline) = config.pipeline().await?;
        let guard = ViewGuard::new();

        let spinner = Spinner::start(
            format!("Regenerating course for '{}'", self.topic.trim()),
            config.progress_enabled(),
        );
        let view = pipeline.regenerate(&self.topic, &guard).await;
        spinner.finish_and_clear();

        let view = view?;
        println!("✅ {}", "Generated a new draft".green());
        print_course(&view);
        Ok(())
    }
}

/// Show one lecture.
#[derive(Args)]
pub struct LectureCommand {
    /// Free-text course topic
    topic: String,

    /// Lecture number, starting at 1
    #[arg(value_parser = parse_lecture_number)]
    number: usize,

    /// Print the body exactly as stored instead of as plain text
    #[arg(long)]
    raw: bool,

    /// Also fetch the lecture illustration
    #[arg(long)]
    image: bool,
}

impl LectureCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let key = course_key(&self.topic)?;
        let (_, pipeline) = config.pipeline().await?;
        let guard = ViewGuard::new();
        let index = self.number - 1;

        let spinner =
            Spinner::start(format!("Opening lecture {}", self.number), config.progress_enabled());
        let lecture = pipeline.open_lecture(&key, index, &guard).await;
        let lecture = match lecture {
            Ok(lecture) => lecture,
            Err(e) => {
                spinner.finish_and_clear();
                return Err(e);
            }
        };

        let image = if self.image {
            spinner.set_message(format!("Illustrating lecture {}", self.number));
            pipeline.lecture_image(&key, index, &guard).await?
        } else {
            None
        };
        spinner.finish_and_clear();

        print_lecture(self.number, &lecture, self.raw);
        if self.image {
            match image {
                Some(image) => println!(
                    "\n{} {} ({} bytes)",
                    "Illustration:".bold(),
                    image.mime_type,
                    image.data.len()
                ),
                None => println!("\n{}", "No illustration available".yellow()),
            }
        }
        Ok(())
    }
}

/// Show which lectures are ready for export.
#[derive(Args)]
pub struct StatusCommand {
    /// Free-text course topic
    topic: String,
}

impl StatusCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let key = course_key(&self.topic)?;
        let (_, pipeline) = config.pipeline().await?;

        let draft = pipeline.draft(&key).await?;
        let readiness = pipeline.readiness(&key).await?;

        println!("{}", draft.title.bold());
        print_readiness(&readiness);
        Ok(())
    }
}

/// Remove everything cached for a topic.
#[derive(Args)]
pub struct DiscardCommand {
    /// Free-text course topic
    topic: String,
}

impl DiscardCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let key = course_key(&self.topic)?;
        let (_, pipeline) = config.pipeline().await?;

        let summary = pipeline.discard(&key).await?;
        if !summary.draft && summary.lectures == 0 && summary.images == 0 {
            println!("Nothing cached for '{}'", key.topic());
            return Ok(());
        }

        println!("✅ Discarded '{}'", key.topic().green());
        if summary.draft {
            println!("  draft");
        }
        println!("  {} lecture(s)", summary.lectures);
        println!("  {} image(s)", summary.images);
        Ok(())
    }
}

fn print_course(view: &CourseView) {
    print_draft(&view.draft);
    if view.key.is_none() {
        println!("\n{}", "Blank topic: this draft was not cached".yellow());
    }
    if view.icon.is_none() {
        tracing::debug!("Course has no icon");
    }
}

pub(super) fn print_draft(draft: &CourseDraft) {
    println!("{}", draft.title.bold());
    if !draft.instructor.is_empty() {
        println!("Instructor: {}", draft.instructor);
    }

    let mut meta = vec![draft.difficulty.to_string()];
    if !draft.estimated_duration.is_empty() {
        meta.push(draft.estimated_duration.clone());
    }
    println!("{}", meta.join(" · ").dimmed());

    if !draft.description.is_empty() {
        println!("\n{}", draft.description);
    }
    if !draft.tags.is_empty() {
        println!("\nTags: {}", draft.tags.join(", ").cyan());
    }

    println!("\n{}", "Syllabus".bold());
    for (i, entry) in draft.syllabus.iter().enumerate() {
        let duration = if entry.duration.is_empty() {
            String::new()
        } else {
            format!(" ({})", entry.duration)
        };
        println!("  {:>2}. {}{}", i + 1, entry.title, duration.dimmed());
        if !entry.summary.is_empty() {
            println!("      {}", entry.summary.dimmed());
        }
    }
}

fn print_lecture(number: usize, lecture: &LectureArtifact, raw: bool) {
    println!("{}", format!("{number}. {}", lecture.title).bold());
    println!();
    if raw || !lecture.is_html {
        println!("{}", lecture.content);
    } else {
        println!("{}", plain_text(&lecture.content));
    }
}

fn print_readiness(readiness: &ExportReadiness) {
    for lecture in &readiness.lectures {
        let marker = match lecture.status {
            LectureStatus::Ready => "✓".green(),
            LectureStatus::Missing => "✗".red(),
            LectureStatus::Degenerate => "!".yellow(),
        };
        println!("  {marker} {:>2}. {} ({})", lecture.index + 1, lecture.title, lecture.status);
    }

    let total = readiness.lectures.len();
    let summary = format!("{}/{} lectures ready", readiness.ready_count(), total);
    if readiness.is_ready() {
        println!("\n{} - {}", summary, "ready to export".green());
    } else {
        println!("\n{} - {}", summary, "not ready to export".yellow());
    }
}
