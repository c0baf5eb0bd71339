//! SQLite FTS5 index backend with BM25 relevance ranking.
//!
//! Two collections, two table pairs:
//!
//! - `courses` + `courses_fts` — one row per course, full [`CourseRecord`]
//!   as JSON, titles indexed for fuzzy resolution
//! - `chunks` + `chunks_fts` — chunk text indexed for content search,
//!   structural metadata (course, lesson, sequence index) as plain columns
//!   for exact-match filtering
//!
//! Re-inserting a course replaces its catalog record, and an incoming chunk
//! batch drops all existing chunks of the same courses first — chunks are
//! regenerated wholesale, never patched.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::Connection;

use coursepilot_core::error::{CoursePilotError, Result};
use coursepilot_core::traits::VectorIndex;
use coursepilot_core::types::{Chunk, Collection, CourseRecord, ScoredMatch, SearchFilter};

pub struct SqliteIndex {
    conn: Mutex<Connection>,
}

impl SqliteIndex {
    /// Open (creating if needed) an index database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(index_err)?;
        Self::with_connection(conn)
    }

    /// Fully in-memory index. Used by tests and throwaway sessions.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(index_err)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS courses (
                title TEXT PRIMARY KEY,
                record TEXT NOT NULL
            );
            CREATE VIRTUAL TABLE IF NOT EXISTS courses_fts USING fts5(
                title,
                tokenize='unicode61'
            );
            CREATE TABLE IF NOT EXISTS chunks (
                id TEXT PRIMARY KEY,
                course_title TEXT NOT NULL,
                lesson_number INTEGER NOT NULL,
                chunk_index INTEGER NOT NULL,
                start_offset INTEGER NOT NULL,
                text TEXT NOT NULL
            );
            CREATE VIRTUAL TABLE IF NOT EXISTS chunks_fts USING fts5(
                id UNINDEXED,
                text,
                tokenize='unicode61'
            );",
        )
        .map_err(index_err)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| CoursePilotError::Index(format!("index lock poisoned: {e}")))
    }

    fn query_catalog(&self, text: &str, k: usize) -> Result<Vec<ScoredMatch>> {
        let Some(match_expr) = fts_match_expr(text) else {
            return Ok(Vec::new());
        };
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT c.record, bm25(courses_fts) AS rank
                 FROM courses_fts f
                 JOIN courses c ON c.title = f.title
                 WHERE courses_fts MATCH ?1
                 ORDER BY rank
                 LIMIT ?2",
            )
            .map_err(index_err)?;
        let rows = stmt
            .query_map(rusqlite::params![match_expr, k as i64], |row| {
                let record: String = row.get(0)?;
                let rank: f64 = row.get(1)?;
                Ok((record, rank))
            })
            .map_err(index_err)?;

        let mut matches = Vec::new();
        for row in rows {
            let (record, rank) = row.map_err(index_err)?;
            let metadata: serde_json::Value = serde_json::from_str(&record)
                .map_err(|e| CoursePilotError::Index(format!("corrupt catalog record: {e}")))?;
            let text = metadata["title"].as_str().unwrap_or_default().to_string();
            matches.push(ScoredMatch {
                text,
                metadata,
                // BM25 ranks are negative, more negative = better
                score: rank.abs() as f32,
            });
        }
        Ok(matches)
    }

    fn query_content(
        &self,
        text: &str,
        k: usize,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<ScoredMatch>> {
        let Some(match_expr) = fts_match_expr(text) else {
            return Ok(Vec::new());
        };

        let mut sql = String::from(
            "SELECT c.text, c.course_title, c.lesson_number, c.chunk_index, bm25(chunks_fts) AS rank
             FROM chunks_fts f
             JOIN chunks c ON c.id = f.id
             WHERE chunks_fts MATCH ?1",
        );
        let mut params: Vec<rusqlite::types::Value> = vec![match_expr.into()];
        if let Some(filter) = filter {
            if let Some(course) = &filter.course_title {
                params.push(course.clone().into());
                sql.push_str(&format!(" AND c.course_title = ?{}", params.len()));
            }
            if let Some(lesson) = filter.lesson_number {
                params.push((lesson as i64).into());
                sql.push_str(&format!(" AND c.lesson_number = ?{}", params.len()));
            }
        }
        params.push((k as i64).into());
        sql.push_str(&format!(" ORDER BY rank LIMIT ?{}", params.len()));

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql).map_err(index_err)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(params), |row| {
                let text: String = row.get(0)?;
                let course: String = row.get(1)?;
                let lesson: i64 = row.get(2)?;
                let chunk_index: i64 = row.get(3)?;
                let rank: f64 = row.get(4)?;
                Ok(ScoredMatch {
                    text,
                    metadata: serde_json::json!({
                        "course_title": course,
                        "lesson_number": lesson,
                        "chunk_index": chunk_index,
                    }),
                    score: rank.abs() as f32,
                })
            })
            .map_err(index_err)?;

        rows.collect::<std::result::Result<Vec<_>, _>>().map_err(index_err)
    }
}

#[async_trait]
impl VectorIndex for SqliteIndex {
    async fn insert_course(&self, record: CourseRecord) -> Result<()> {
        let json = serde_json::to_string(&record)
            .map_err(|e| CoursePilotError::Index(e.to_string()))?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO courses (title, record) VALUES (?1, ?2)",
            rusqlite::params![record.title, json],
        )
        .map_err(index_err)?;
        conn.execute(
            "DELETE FROM courses_fts WHERE title = ?1",
            rusqlite::params![record.title],
        )
        .map_err(index_err)?;
        conn.execute(
            "INSERT INTO courses_fts (title) VALUES (?1)",
            rusqlite::params![record.title],
        )
        .map_err(index_err)?;
        Ok(())
    }

    async fn insert_chunks(&self, chunks: Vec<Chunk>) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(index_err)?;

        // Wholesale regeneration: clear existing chunks for the courses
        // present in this batch before inserting.
        let mut titles: Vec<&str> = chunks.iter().map(|c| c.course_title.as_str()).collect();
        titles.sort_unstable();
        titles.dedup();
        for title in titles {
            tx.execute(
                "DELETE FROM chunks_fts WHERE id IN (SELECT id FROM chunks WHERE course_title = ?1)",
                rusqlite::params![title],
            )
            .map_err(index_err)?;
            tx.execute(
                "DELETE FROM chunks WHERE course_title = ?1",
                rusqlite::params![title],
            )
            .map_err(index_err)?;
        }

        for chunk in &chunks {
            let id = uuid::Uuid::new_v4().to_string();
            tx.execute(
                "INSERT INTO chunks (id, course_title, lesson_number, chunk_index, start_offset, text)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    id,
                    chunk.course_title,
                    chunk.lesson_number as i64,
                    chunk.chunk_index as i64,
                    chunk.start_offset as i64,
                    chunk.text,
                ],
            )
            .map_err(index_err)?;
            tx.execute(
                "INSERT INTO chunks_fts (id, text) VALUES (?1, ?2)",
                rusqlite::params![id, chunk.text],
            )
            .map_err(index_err)?;
        }

        tx.commit().map_err(index_err)?;
        tracing::debug!(chunks = chunks.len(), "indexed chunk batch");
        Ok(())
    }

    async fn query(
        &self,
        collection: Collection,
        text: &str,
        k: usize,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<ScoredMatch>> {
        match collection {
            Collection::Catalog => self.query_catalog(text, k),
            Collection::Content => self.query_content(text, k, filter),
        }
    }

    async fn course(&self, title: &str) -> Result<Option<CourseRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT record FROM courses WHERE title = ?1")
            .map_err(index_err)?;
        let record: Option<String> = stmt
            .query_row(rusqlite::params![title], |row| row.get(0))
            .ok();
        match record {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| CoursePilotError::Index(format!("corrupt catalog record: {e}"))),
            None => Ok(None),
        }
    }

    async fn course_titles(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT title FROM courses ORDER BY title")
            .map_err(index_err)?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(index_err)?;
        rows.collect::<std::result::Result<Vec<_>, _>>().map_err(index_err)
    }

    async fn clear(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "DELETE FROM courses;
             DELETE FROM courses_fts;
             DELETE FROM chunks;
             DELETE FROM chunks_fts;",
        )
        .map_err(index_err)
    }
}

fn index_err(e: rusqlite::Error) -> CoursePilotError {
    CoursePilotError::Index(e.to_string())
}

/// Sanitize free text into an FTS5 MATCH expression: strip operators and
/// OR the remaining tokens so any overlapping term can rank.
fn fts_match_expr(text: &str) -> Option<String> {
    let tokens: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|t| !t.is_empty())
        .map(|t| format!("\"{t}\""))
        .collect();
    if tokens.is_empty() {
        None
    } else {
        Some(tokens.join(" OR "))
    }
}
