//! The retrieval capability — two similarity-searchable collections.
//!
//! CoursePilot consumes the index as an opaque capability: records go in,
//! ranked matches come out. Embedding (or any other relevance machinery)
//! is the implementation's business; queries are plain text. Writes happen
//! during ingestion only, so implementations may assume read-mostly use.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Chunk, Collection, CourseRecord, ScoredMatch, SearchFilter};

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert (or replace) one course's catalog record.
    async fn insert_course(&self, record: CourseRecord) -> Result<()>;

    /// Insert a course's chunks. Chunks for a course are always written
    /// as a whole batch — there are no partial-chunk updates.
    async fn insert_chunks(&self, chunks: Vec<Chunk>) -> Result<()>;

    /// Similarity query against one collection, restricted by an optional
    /// exact-match filter, returning at most `k` matches ranked best-first.
    /// No match above the relevance floor is an empty vec, not an error.
    async fn query(
        &self,
        collection: Collection,
        text: &str,
        k: usize,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<ScoredMatch>>;

    /// Exact catalog lookup by stored title.
    async fn course(&self, title: &str) -> Result<Option<CourseRecord>>;

    /// All stored course titles.
    async fn course_titles(&self) -> Result<Vec<String>>;

    /// Drop both collections. Used before a full re-ingest.
    async fn clear(&self) -> Result<()>;
}
