//! `musai edit`: change the cached draft in place.
//!
//! All flags given in one invocation form a single edit session that is
//! committed at once, or not at all if any edit is rejected. Lecture numbers
//! refer to the syllabus as it was before the command ran.

use super::course::print_draft;
use super::{CliConfig, course_key, parse_lecture_number};
use crate::course::{Difficulty, SyllabusEntry};
use crate::editor::DraftEdit;
use anyhow::Result;
use clap::Args;
use colored::Colorize;

/// Edit the cached draft.
#[derive(Args)]
pub struct EditCommand {
    /// Free-text course topic
    topic: String,

    /// New course title
    #[arg(long)]
    title: Option<String>,

    /// New course description
    #[arg(long)]
    description: Option<String>,

    /// New instructor name
    #[arg(long)]
    instructor: Option<String>,

    /// New difficulty (beginner, intermediate, advanced)
    #[arg(long)]
    difficulty: Option<Difficulty>,

    /// New total duration, e.g. "6 weeks"
    #[arg(long)]
    duration: Option<String>,

    /// Add a tag (repeatable)
    #[arg(long = "add-tag", value_name = "TAG")]
    add_tags: Vec<String>,

    /// Remove a tag (repeatable)
    #[arg(long = "remove-tag", value_name = "TAG")]
    remove_tags: Vec<String>,

    /// Rename a lecture: NUMBER=TITLE (repeatable)
    #[arg(long = "rename", value_name = "NUMBER=TITLE", value_parser = parse_rename)]
    renames: Vec<(usize, String)>,

    /// Remove a lecture by number (repeatable)
    #[arg(long = "remove-lecture", value_name = "NUMBER", value_parser = parse_lecture_number)]
    remove_lectures: Vec<usize>,

    /// Append a lecture with the given title (repeatable)
    #[arg(long = "add-lecture", value_name = "TITLE")]
    add_lectures: Vec<String>,
}

impl EditCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let key = course_key(&self.topic)?;
        let (_, pipeline) = config.pipeline().await?;

        let edits = self.edits();
        if edits.is_empty() {
            println!("Nothing to edit. See 'musai edit --help' for the available changes.");
            return Ok(());
        }

        let mut session = pipeline.begin_edit(&key).await?;
        for edit in edits {
            session = session.apply(edit)?;
        }

        if !session.is_dirty() {
            println!("No changes to '{}'", session.working().title);
            return Ok(());
        }

        let orphaned = session.orphaned_lectures();
        let draft = pipeline.commit(session).await?;

        println!("✅ {}\n", "Draft updated".green());
        print_draft(&draft);
        if !orphaned.is_empty() {
            println!("\n{}", "No longer in the syllabus (cached lectures are kept):".yellow());
            for title in orphaned {
                println!("  - {title}");
            }
        }
        Ok(())
    }

    /// Translate the flags into edits, in an order where lecture numbers
    /// still match the original syllabus.
    fn edits(&self) -> Vec<DraftEdit> {
        let mut edits = Vec::new();

        if let Some(title) = &self.title {
            edits.push(DraftEdit::SetTitle(title.clone()));
        }
        if let Some(description) = &self.description {
            edits.push(DraftEdit::SetDescription(description.clone()));
        }
        if let Some(instructor) = &self.instructor {
            edits.push(DraftEdit::SetInstructor(instructor.clone()));
        }
        if let Some(difficulty) = self.difficulty {
            edits.push(DraftEdit::SetDifficulty(difficulty));
        }
        if let Some(duration) = &self.duration {
            edits.push(DraftEdit::SetEstimatedDuration(duration.clone()));
        }
        edits.extend(self.remove_tags.iter().cloned().map(DraftEdit::RemoveTag));
        edits.extend(self.add_tags.iter().cloned().map(DraftEdit::AddTag));

        for (number, title) in &self.renames {
            edits.push(DraftEdit::RetitleLecture {
                index: number - 1,
                title: title.clone(),
            });
        }

        // Highest first so earlier removals don't shift later ones.
        let mut removals = self.remove_lectures.clone();
        removals.sort_unstable_by(|a, b| b.cmp(a));
        removals.dedup();
        edits.extend(removals.into_iter().map(|number| DraftEdit::RemoveLecture(number - 1)));

        edits.extend(
            self.add_lectures
                .iter()
                .map(|title| DraftEdit::AddLecture(SyllabusEntry::new(title.clone(), "", ""))),
        );
        edits
    }
}

fn parse_rename(value: &str) -> Result<(usize, String), String> {
    let (number, title) = value
        .split_once('=')
        .ok_or_else(|| format!("expected NUMBER=TITLE, got '{value}'"))?;
    let number = parse_lecture_number(number)?;
    if title.trim().is_empty() {
        return Err("lecture title cannot be empty".to_string());
    }
    Ok((number, title.trim().to_string()))
}
