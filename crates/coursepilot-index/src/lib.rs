//! # CoursePilot Index
//!
//! Retrieval layer:
//!
//! - [`sqlite::SqliteIndex`] — the bundled [`VectorIndex`] implementation.
//!   SQLite FTS5 with BM25 relevance ranking over two collections (course
//!   catalog + chunk content): zero setup, no external vector DB, and
//!   swappable behind the trait for deployments that want one.
//! - [`retriever::Retriever`] — translates a natural-language need into
//!   index queries: fuzzy course-name resolution with a confidence
//!   threshold, filtered chunk search with deterministic ordering, and
//!   catalog lookups (outlines, lesson links).
//!
//! [`VectorIndex`]: coursepilot_core::traits::VectorIndex

pub mod retriever;
pub mod sqlite;

pub use retriever::{RetrievedChunk, Retriever};
pub use sqlite::SqliteIndex;
