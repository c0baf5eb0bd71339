//! Course document parser.
//!
//! Expected format:
//!
//! ```text
//! Course Title: Intro to X
//! Course Link: https://example.com/intro-to-x
//! Course Instructor: Ada Lovelace
//!
//! Lesson 0: Introduction
//! Lesson Link: https://example.com/intro-to-x/0
//! Welcome to the course...
//!
//! Lesson 1: Basics
//! ...
//! ```
//!
//! The header label prefixes (`Course Title:` etc.) are optional — the
//! first three non-empty-after-strip lines are title, link, and instructor.
//! Text appearing before the first lesson marker becomes lesson 0
//! ("Introduction") when non-empty.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use coursepilot_core::error::{CoursePilotError, Result};
use coursepilot_core::types::{Course, Lesson};

static LESSON_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Lesson\s+(\d+):\s*(.*)$").unwrap());
static LESSON_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Lesson Link:\s*(\S+)\s*$").unwrap());

/// Read and parse a course document from disk.
pub fn parse_file(path: &Path) -> Result<Course> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        CoursePilotError::Ingestion(format!("Failed to read {}: {e}", path.display()))
    })?;
    parse_document(&raw)
}

/// Parse a raw course document into its header and ordered lessons.
pub fn parse_document(raw: &str) -> Result<Course> {
    let mut lines = raw.lines();

    let title = header_line(lines.next(), "Course Title:", "course title")?;
    let link = header_line(lines.next(), "Course Link:", "course link")?;
    let instructor = header_line(lines.next(), "Course Instructor:", "course instructor")?;

    let mut lessons: Vec<Lesson> = Vec::new();
    let mut current: Option<(u32, String, Option<String>)> = None;
    let mut body_lines: Vec<&str> = Vec::new();
    let mut preamble: Vec<&str> = Vec::new();

    let flush = |current: &mut Option<(u32, String, Option<String>)>,
                     body_lines: &mut Vec<&str>,
                     lessons: &mut Vec<Lesson>| {
        if let Some((number, title, link)) = current.take() {
            lessons.push(Lesson {
                number,
                title,
                link,
                body: body_lines.join("\n").trim().to_string(),
            });
            body_lines.clear();
        }
    };

    for line in lines {
        if let Some(caps) = LESSON_MARKER.captures(line) {
            flush(&mut current, &mut body_lines, &mut lessons);
            // Marker number is caller-defined; digits guaranteed by the regex
            let number: u32 = caps[1].parse().map_err(|_| {
                CoursePilotError::Ingestion(format!("Lesson number out of range: {}", &caps[1]))
            })?;
            current = Some((number, caps[2].trim().to_string(), None));
        } else if let Some(caps) = LESSON_LINK.captures(line) {
            match &mut current {
                // Only meaningful directly under a marker, before body text
                Some((_, _, link @ None)) if body_lines.iter().all(|l| l.trim().is_empty()) => {
                    *link = Some(caps[1].to_string());
                    body_lines.clear();
                }
                _ => body_lines.push(line),
            }
        } else if current.is_some() {
            body_lines.push(line);
        } else {
            preamble.push(line);
        }
    }
    flush(&mut current, &mut body_lines, &mut lessons);

    // Untagged leading text still has to be searchable
    let preamble_body = preamble.join("\n").trim().to_string();
    if !preamble_body.is_empty() {
        lessons.insert(
            0,
            Lesson {
                number: 0,
                title: "Introduction".to_string(),
                link: None,
                body: preamble_body,
            },
        );
    }

    Ok(Course { title, link, instructor, lessons })
}

fn header_line(line: Option<&str>, label: &str, field: &str) -> Result<String> {
    let line = line.ok_or_else(|| CoursePilotError::MissingHeaderField(field.to_string()))?;
    let value = match line.get(..label.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(label) => line[label.len()..].trim(),
        _ => line.trim(),
    };
    if value.is_empty() {
        return Err(CoursePilotError::MissingHeaderField(field.to_string()));
    }
    Ok(value.to_string())
}
