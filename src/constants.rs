//! Global constants used throughout the Musai course pipeline.
//!
//! Timeouts, content thresholds, and storage layout names live here so the
//! numbers shared between the gateway, the store, and the CLI are discoverable
//! in one place. Anything a user may want to tune is also exposed through
//! [`crate::config::MusaiConfig`]; the values below are only the defaults.

use std::time::Duration;

/// Default minimum number of prose characters a lecture needs, after markup
/// stripping, to count as meaningfully present.
///
/// The value is a heuristic carried over from the web client and is exposed as
/// `content.min_meaningful_chars` in the config file.
pub const DEFAULT_MIN_MEANINGFUL_CHARS: usize = 20;

/// Default timeout for a single generation request (180 seconds).
///
/// Course drafts and lecture bodies come from a workflow backend that chains
/// several model calls per request.
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(180);

/// How long a caller waits on another caller's in-flight generation for the
/// same key before giving up on the notification and re-checking the store.
pub const PENDING_STATE_TIMEOUT: Duration = Duration::from_secs(300);

/// Mime type assumed for images whose type the service did not report.
pub const DEFAULT_IMAGE_MIME: &str = "image/png";

/// Name of the directory (under the user's home) holding config and store.
pub const MUSAI_HOME_DIR: &str = ".musai";

/// Config file name inside [`MUSAI_HOME_DIR`].
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Store directory name inside [`MUSAI_HOME_DIR`].
pub const STORE_DIR_NAME: &str = "store";

/// Filename used for exports whose title normalizes to nothing.
pub const FALLBACK_EXPORT_STEM: &str = "course";
