//! Integration test suite for the course pipeline
//!
//! End-to-end tests that drive [`CoursePipeline`](musai_course::pipeline::CoursePipeline)
//! against the scripted generation service, the HTTP client against a
//! `wiremock` server, and the `musai` binary through `assert_cmd`.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **caching**: idempotent keys, no duplicate generation, persistence
//! - **failures**: failed, degenerate and stale responses leave the cache alone
//! - **export**: completeness floor, gating and assembly
//! - **editing**: identity across edits, renames, discard
//! - **http_service**: wire mapping of the HTTP generation client
//! - **cli**: the `musai` binary

mod common;

mod caching;
mod cli;
mod editing;
mod export;
mod http_service;
