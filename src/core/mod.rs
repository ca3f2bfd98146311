//! Core types shared by every stage of the pipeline.
//!
//! At the moment this is the error layer: [`GenerationError`] for failures
//! reported by the external service, [`MusaiError`] for the pipeline itself,
//! and [`ErrorContext`] / [`user_friendly_error`] for CLI presentation.

pub mod error;

pub use error::{ErrorContext, GenerationError, MusaiError, user_friendly_error};
