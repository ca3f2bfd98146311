//! Shared utilities
//!
//! # Modules
//!
//! - [`fs`] - atomic writes and directory creation
//! - [`progress`] - spinner for long generation calls
//!
//! # Example
//!
//! ```rust,no_run
//! use musai_course::utils::{atomic_write, ensure_dir};
//! use std::path::Path;
//!
//! # fn example() -> anyhow::Result<()> {
//! ensure_dir(Path::new("exports"))?;
//! atomic_write(Path::new("exports/course.html"), b"<html></html>")?;
//! # Ok(())
//! # }
//! ```

pub mod fs;
pub mod progress;

pub use fs::{atomic_write, ensure_dir};
pub use progress::Spinner;
