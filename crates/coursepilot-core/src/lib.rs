//! # CoursePilot Core
//!
//! Shared foundation for all CoursePilot crates: configuration, the error
//! taxonomy, domain types (courses, lessons, chunks, sources), LLM message
//! types, and the trait seams the pipeline is assembled from:
//!
//! - [`traits::Provider`] — the generation capability (LLM chat with tools)
//! - [`traits::Tool`] — a schema-described operation the model may invoke
//! - [`traits::VectorIndex`] — the dual-collection retrieval capability

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::CoursePilotConfig;
pub use error::{CoursePilotError, Result};
