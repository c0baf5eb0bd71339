//! Overlapping char-window chunker.
//!
//! Windows are fixed-stride: chunk `i` starts at exactly
//! `i * (chunk_size - chunk_overlap)` chars into the lesson body, covering
//! `chunk_size` chars. A window end that would land mid-word is extended
//! forward to the next whitespace, so a chunk never ends with half a word;
//! the following chunk's overlap region re-covers the boundary. The final
//! window may be shorter. A body no longer than `chunk_size` yields exactly
//! one chunk.

use coursepilot_core::config::ChunkingConfig;
use coursepilot_core::types::Chunk;

/// Split one lesson body into overlapping chunks.
///
/// Returns an empty vec for a blank body. Start offsets and sequence
/// indices are recorded on each chunk for stable re-ordering and exact
/// reconstruction.
pub fn chunk_lesson(
    config: &ChunkingConfig,
    course_title: &str,
    lesson_number: u32,
    body: &str,
) -> Vec<Chunk> {
    debug_assert!(config.chunk_overlap < config.chunk_size);

    if body.trim().is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = body.chars().collect();
    let len = chars.len();
    let size = config.chunk_size;
    let step = size - config.chunk_overlap;

    let mut chunks = Vec::new();
    let mut start = 0usize;
    loop {
        let mut end = (start + size).min(len);
        // Never cut a word at the chunk end: extend to the next whitespace.
        if end < len && !chars[end - 1].is_whitespace() && !chars[end].is_whitespace() {
            while end < len && !chars[end].is_whitespace() {
                end += 1;
            }
        }

        chunks.push(Chunk {
            text: chars[start..end].iter().collect(),
            course_title: course_title.to_string(),
            lesson_number,
            chunk_index: chunks.len(),
            start_offset: start,
        });

        start += step;
        // Next window must contribute beyond the overlap it repeats
        if start + config.chunk_overlap >= len {
            break;
        }
    }

    tracing::debug!(
        course = course_title,
        lesson = lesson_number,
        chunks = chunks.len(),
        chars = len,
        "chunked lesson"
    );
    chunks
}
