//! Shared types: course domain model and LLM chat/tool message types.

use serde::{Deserialize, Serialize};

// ── Course domain ──────────────────────────────────────

/// A parsed course document. Immutable once parsed; identity = title.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub title: String,
    pub link: String,
    pub instructor: String,
    pub lessons: Vec<Lesson>,
}

/// Ordered sub-unit of a course. Owned by its course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lesson {
    pub number: u32,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub body: String,
}

/// Lesson entry stored in the catalog (body omitted).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonSummary {
    pub number: u32,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// Catalog record for one course — the metadata-collection unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseRecord {
    pub title: String,
    pub link: String,
    pub instructor: String,
    pub lessons: Vec<LessonSummary>,
}

impl CourseRecord {
    pub fn from_course(course: &Course) -> Self {
        Self {
            title: course.title.clone(),
            link: course.link.clone(),
            instructor: course.instructor.clone(),
            lessons: course
                .lessons
                .iter()
                .map(|l| LessonSummary {
                    number: l.number,
                    title: l.title.clone(),
                    link: l.link.clone(),
                })
                .collect(),
        }
    }

    pub fn lesson_link(&self, lesson_number: u32) -> Option<&str> {
        self.lessons
            .iter()
            .find(|l| l.number == lesson_number)
            .and_then(|l| l.link.as_deref())
    }
}

/// A bounded, overlapping slice of lesson text — the retrieval unit.
///
/// `start_offset` is the char offset of the slice within the lesson body;
/// consecutive chunks overlap, so offsets are what make exact
/// reconstruction possible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub course_title: String,
    pub lesson_number: u32,
    /// Zero-based sequence index within the lesson.
    pub chunk_index: usize,
    /// Char offset of this chunk's start within the lesson body.
    pub start_offset: usize,
}

/// Citation metadata attached to retrieved content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub course_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lesson_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl SourceRecord {
    /// Display label, e.g. "Intro to X - Lesson 1".
    pub fn label(&self) -> String {
        match self.lesson_number {
            Some(n) => format!("{} - Lesson {}", self.course_title, n),
            None => self.course_title.clone(),
        }
    }

    /// Dedup key: `(course, lesson)`.
    pub fn key(&self) -> (String, Option<u32>) {
        (self.course_title.clone(), self.lesson_number)
    }
}

/// Deduplicate source records by `(course, lesson)`, preserving
/// first-seen order.
pub fn dedup_sources(sources: Vec<SourceRecord>) -> Vec<SourceRecord> {
    let mut seen = std::collections::HashSet::new();
    sources
        .into_iter()
        .filter(|s| seen.insert(s.key()))
        .collect()
}

// ── Index query types ──────────────────────────────────

/// The two logical collections held by a [`crate::traits::VectorIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    /// Per-course metadata records (course resolution, outlines).
    Catalog,
    /// Chunk content (semantic search).
    Content,
}

/// Exact-match restrictions applied on top of similarity search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilter {
    pub course_title: Option<String>,
    pub lesson_number: Option<u32>,
}

impl SearchFilter {
    pub fn is_empty(&self) -> bool {
        self.course_title.is_none() && self.lesson_number.is_none()
    }
}

/// One ranked match returned by an index query.
#[derive(Debug, Clone)]
pub struct ScoredMatch {
    pub text: String,
    /// Collection-specific payload (chunk metadata or a serialized
    /// [`CourseRecord`]).
    pub metadata: serde_json::Value,
    /// Relevance score, higher is better.
    pub score: f32,
}

// ── LLM chat types ─────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into(), tool_call_id: None, tool_calls: None }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into(), tool_call_id: None, tool_calls: None }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into(), tool_call_id: None, tool_calls: None }
    }

    /// Assistant turn carrying tool invocations.
    pub fn assistant_tool_calls(content: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_call_id: None,
            tool_calls: Some(calls),
        }
    }

    /// Tool-result turn answering one tool invocation.
    pub fn tool(content: impl Into<String>, tool_call_id: &str) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_call_id: Some(tool_call_id.to_string()),
            tool_calls: None,
        }
    }
}

/// A structured request from the model to execute a named tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded arguments, as sent by the model.
    pub arguments: String,
}

/// Schema describing one tool to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Output of one tool execution.
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub output: String,
    pub sources: Vec<SourceRecord>,
}

/// One model response: either a direct answer or requested tool calls.
#[derive(Debug, Clone, Default)]
pub struct ProviderResponse {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: Option<String>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Default)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_record_label() {
        let with_lesson = SourceRecord {
            course_title: "Intro to X".into(),
            lesson_number: Some(1),
            link: None,
        };
        assert_eq!(with_lesson.label(), "Intro to X - Lesson 1");

        let course_only = SourceRecord {
            course_title: "Intro to X".into(),
            lesson_number: None,
            link: None,
        };
        assert_eq!(course_only.label(), "Intro to X");
    }

    #[test]
    fn test_dedup_sources_preserves_first_seen_order() {
        let src = |course: &str, lesson: u32| SourceRecord {
            course_title: course.into(),
            lesson_number: Some(lesson),
            link: None,
        };
        let deduped = dedup_sources(vec![
            src("A", 1),
            src("B", 2),
            src("A", 1),
            src("A", 2),
        ]);
        assert_eq!(deduped.len(), 3);
        assert_eq!(deduped[0].label(), "A - Lesson 1");
        assert_eq!(deduped[1].label(), "B - Lesson 2");
        assert_eq!(deduped[2].label(), "A - Lesson 2");
    }

    #[test]
    fn test_course_record_lesson_link() {
        let record = CourseRecord {
            title: "T".into(),
            link: "https://example.com".into(),
            instructor: "I".into(),
            lessons: vec![
                LessonSummary { number: 0, title: "Intro".into(), link: None },
                LessonSummary {
                    number: 1,
                    title: "Basics".into(),
                    link: Some("https://example.com/1".into()),
                },
            ],
        };
        assert_eq!(record.lesson_link(1), Some("https://example.com/1"));
        assert_eq!(record.lesson_link(0), None);
        assert_eq!(record.lesson_link(9), None);
    }

    #[test]
    fn test_message_roles_serialize_lowercase() {
        let msg = Message::user("hello");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "user");
        assert!(json.get("tool_calls").is_none());
    }
}
