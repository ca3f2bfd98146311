//! Spinner shown while waiting on the generation service.
//!
//! Generation calls take anywhere from seconds to minutes and report no
//! intermediate progress, so the CLI only ever needs an indeterminate spinner.
//!
//! # Environment Variables
//!
//! - `MUSAI_NO_PROGRESS`: set to any value to hide all spinners (also
//!   available as `--no-progress`)

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle as IndicatifStyle};
use std::time::Duration;

const SPINNER_FRAMES: [&str; 11] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "✓"];

/// Whether spinners are disabled through the environment.
#[must_use]
pub fn is_progress_disabled() -> bool {
    std::env::var("MUSAI_NO_PROGRESS").is_ok()
}

/// An indeterminate progress spinner.
///
/// A disabled spinner is a hidden `indicatif` bar: every call is accepted and
/// nothing is drawn, so callers never branch on whether output is wanted.
#[derive(Clone)]
pub struct Spinner {
    inner: IndicatifBar,
}

impl Spinner {
    /// Start a spinner with `message`, hidden when `enabled` is false or
    /// `MUSAI_NO_PROGRESS` is set.
    pub fn start(message: impl Into<String>, enabled: bool) -> Self {
        let bar = if !enabled || is_progress_disabled() {
            IndicatifBar::hidden()
        } else {
            let bar = IndicatifBar::new_spinner();
            bar.set_style(spinner_style());
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        };
        bar.set_message(message.into());
        Self {
            inner: bar,
        }
    }

    /// Replace the spinner message.
    pub fn set_message(&self, msg: impl Into<String>) {
        self.inner.set_message(msg.into());
    }

    /// Stop and leave `msg` on screen.
    pub fn finish_with_message(&self, msg: impl Into<String>) {
        self.inner.finish_with_message(msg.into());
    }

    /// Stop and erase the spinner line.
    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }

    /// Whether nothing is drawn.
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.inner.is_hidden()
    }
}

fn spinner_style() -> IndicatifStyle {
    IndicatifStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| IndicatifStyle::default_spinner())
        .tick_strings(&SPINNER_FRAMES)
}
