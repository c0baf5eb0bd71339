//! # CoursePilot Ingest
//!
//! Turns raw course documents into catalog records and retrieval chunks:
//!
//! - [`document`] — parses the three-line header + `Lesson N:` marker format
//! - [`chunker`] — fixed-stride overlapping char windows over lesson bodies

pub mod chunker;
pub mod document;

pub use chunker::chunk_lesson;
pub use document::{parse_document, parse_file};
