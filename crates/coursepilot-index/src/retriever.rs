//! Retriever — natural-language needs in, ranked cited chunks out.

use std::collections::HashMap;
use std::sync::Arc;

use coursepilot_core::config::RetrievalConfig;
use coursepilot_core::error::Result;
use coursepilot_core::traits::VectorIndex;
use coursepilot_core::types::{Collection, CourseRecord, SearchFilter, SourceRecord};

/// One chunk returned from a search, with its citation and score.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub text: String,
    pub source: SourceRecord,
    pub score: f32,
    pub chunk_index: usize,
}

/// Translates queries into index lookups. The index itself is opaque —
/// swapping the engine never touches this logic.
pub struct Retriever {
    index: Arc<dyn VectorIndex>,
    max_results: usize,
    min_course_confidence: f32,
}

impl Retriever {
    pub fn new(index: Arc<dyn VectorIndex>, config: &RetrievalConfig) -> Self {
        Self {
            index,
            max_results: config.max_results,
            min_course_confidence: config.min_course_confidence,
        }
    }

    /// Resolve a fuzzy course reference to a stored title.
    ///
    /// An exact (case-insensitive) title match wins with maximal
    /// confidence. Otherwise catalog similarity only shortlists candidate
    /// titles; the accept/reject decision uses [`title_confidence`], which
    /// does not depend on catalog size (relevance scores for a near-empty
    /// catalog are not comparable across corpus sizes). Below the
    /// threshold this reports `None` rather than guessing.
    pub async fn resolve_course_name(&self, fuzzy: &str) -> Result<Option<String>> {
        let fuzzy = fuzzy.trim();
        if fuzzy.is_empty() {
            return Ok(None);
        }

        for title in self.index.course_titles().await? {
            if title.eq_ignore_ascii_case(fuzzy) {
                return Ok(Some(title));
            }
        }

        let candidates = self.index.query(Collection::Catalog, fuzzy, 5, None).await?;
        let mut best: Option<(&str, f32)> = None;
        for candidate in &candidates {
            let Some(title) = candidate.metadata["title"].as_str() else {
                continue;
            };
            let confidence = title_confidence(fuzzy, title);
            if best.is_none_or(|(_, c)| confidence > c) {
                best = Some((title, confidence));
            }
        }

        match best {
            Some((title, confidence)) if confidence >= self.min_course_confidence => {
                Ok(Some(title.to_string()))
            }
            _ => {
                tracing::debug!(
                    query = fuzzy,
                    confidence = best.map(|(_, c)| c).unwrap_or(0.0),
                    threshold = self.min_course_confidence,
                    "no course match above confidence threshold"
                );
                Ok(None)
            }
        }
    }

    /// Search chunk content, optionally restricted to an already-resolved
    /// course title and/or lesson number.
    ///
    /// Results are ordered by descending score; ties break by ascending
    /// chunk sequence index so repeated calls over a fixed index are
    /// reproducible. `k` is capped at the configured maximum. An empty vec
    /// means nothing cleared the relevance floor — not an error.
    pub async fn search(
        &self,
        query: &str,
        course_title: Option<&str>,
        lesson_number: Option<u32>,
        k: Option<usize>,
    ) -> Result<Vec<RetrievedChunk>> {
        let k = k.unwrap_or(self.max_results).min(self.max_results);
        let filter = SearchFilter {
            course_title: course_title.map(String::from),
            lesson_number,
        };
        let filter = (!filter.is_empty()).then_some(filter);

        let matches = self
            .index
            .query(Collection::Content, query, k, filter.as_ref())
            .await?;

        // One catalog fetch per distinct course for lesson links
        let mut records: HashMap<String, Option<CourseRecord>> = HashMap::new();
        let mut chunks = Vec::with_capacity(matches.len());
        for m in matches {
            let course = m.metadata["course_title"].as_str().unwrap_or_default().to_string();
            let lesson = m.metadata["lesson_number"].as_u64().map(|n| n as u32);
            let chunk_index = m.metadata["chunk_index"].as_u64().unwrap_or(0) as usize;

            if !records.contains_key(&course) {
                let record = self.index.course(&course).await?;
                records.insert(course.clone(), record);
            }
            let link = records
                .get(&course)
                .and_then(|r| r.as_ref())
                .and_then(|r| lesson.and_then(|n| r.lesson_link(n)))
                .map(String::from);

            chunks.push(RetrievedChunk {
                text: m.text,
                source: SourceRecord { course_title: course, lesson_number: lesson, link },
                score: m.score,
                chunk_index,
            });
        }

        chunks.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.chunk_index.cmp(&b.chunk_index))
        });
        Ok(chunks)
    }

    /// Full catalog record for an already-resolved course title.
    pub async fn outline(&self, course_title: &str) -> Result<Option<CourseRecord>> {
        self.index.course(course_title).await
    }

    /// Catalog lookup of one lesson's link.
    pub async fn lesson_link(&self, course_title: &str, lesson: u32) -> Result<Option<String>> {
        Ok(self
            .index
            .course(course_title)
            .await?
            .and_then(|r| r.lesson_link(lesson).map(String::from)))
    }

    /// All stored course titles.
    pub async fn course_titles(&self) -> Result<Vec<String>> {
        self.index.course_titles().await
    }
}

/// Words too generic to identify a course on their own.
const GENERIC_TOKENS: &[&str] = &[
    "a", "an", "and", "class", "course", "courses", "for", "in", "intro",
    "introduction", "lesson", "lessons", "of", "on", "the", "to",
];

/// Confidence (0..1) that `query` refers to `title`: the share of the
/// query's distinctive token mass (length-weighted, generic words
/// excluded) found within the title's tokens. A query whose distinctive
/// words all miss scores 0 no matter how much filler overlaps.
fn title_confidence(query: &str, title: &str) -> f32 {
    let title_tokens = tokens(title);
    let mut total = 0usize;
    let mut matched = 0usize;
    for token in tokens(query) {
        if GENERIC_TOKENS.contains(&token.as_str()) {
            continue;
        }
        total += token.len();
        if title_tokens.iter().any(|t| t.contains(&token)) {
            matched += token.len();
        }
    }
    if total == 0 { 0.0 } else { matched as f32 / total as f32 }
}

fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}
