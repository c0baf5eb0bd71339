//! Course outline lookup, exposed to the model as `get_course_outline`.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use coursepilot_core::error::{CoursePilotError, Result};
use coursepilot_core::traits::Tool;
use coursepilot_core::types::{SourceRecord, ToolDefinition, ToolResult};
use coursepilot_index::Retriever;

#[derive(Debug, Deserialize)]
struct OutlineArgs {
    course_name: String,
}

/// Returns a course's title, link, instructor, and complete lesson list.
pub struct CourseOutlineTool {
    retriever: Arc<Retriever>,
    last_sources: Mutex<Vec<SourceRecord>>,
}

impl CourseOutlineTool {
    pub fn new(retriever: Arc<Retriever>) -> Self {
        Self { retriever, last_sources: Mutex::new(Vec::new()) }
    }
}

#[async_trait]
impl Tool for CourseOutlineTool {
    fn name(&self) -> &str {
        "get_course_outline"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "get_course_outline".into(),
            description: "Get a course's title, link, and complete lesson list".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "course_name": {
                        "type": "string",
                        "description": "Course title (partial matches work, e.g. 'MCP')"
                    }
                },
                "required": ["course_name"]
            }),
        }
    }

    async fn execute(&self, arguments: &str) -> Result<ToolResult> {
        let args: OutlineArgs = serde_json::from_str(arguments)
            .map_err(|e| CoursePilotError::Tool(format!("get_course_outline: {e}")))?;

        let Some(title) = self.retriever.resolve_course_name(&args.course_name).await? else {
            return Ok(ToolResult {
                output: format!("No course found matching '{}'.", args.course_name),
                sources: Vec::new(),
            });
        };

        let Some(record) = self.retriever.outline(&title).await? else {
            return Ok(ToolResult {
                output: format!("No course found matching '{}'.", args.course_name),
                sources: Vec::new(),
            });
        };

        let mut out = format!(
            "Course: {}\nCourse Link: {}\nInstructor: {}\n\nLessons ({}):\n",
            record.title,
            record.link,
            record.instructor,
            record.lessons.len()
        );
        for lesson in &record.lessons {
            out.push_str(&format!("Lesson {}: {}\n", lesson.number, lesson.title));
        }

        let source = SourceRecord {
            course_title: record.title.clone(),
            lesson_number: None,
            link: Some(record.link.clone()),
        };
        self.last_sources.lock().unwrap().push(source.clone());
        Ok(ToolResult { output: out, sources: vec![source] })
    }

    fn take_sources(&self) -> Vec<SourceRecord> {
        std::mem::take(&mut self.last_sources.lock().unwrap())
    }

    fn reset_sources(&self) {
        self.last_sources.lock().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coursepilot_core::config::RetrievalConfig;
    use coursepilot_core::traits::VectorIndex;
    use coursepilot_core::types::{Chunk, Collection, CourseRecord, LessonSummary, ScoredMatch, SearchFilter};

    struct StubIndex {
        courses: Vec<CourseRecord>,
    }

    #[async_trait]
    impl VectorIndex for StubIndex {
        async fn insert_course(&self, _record: CourseRecord) -> Result<()> {
            Ok(())
        }
        async fn insert_chunks(&self, _chunks: Vec<Chunk>) -> Result<()> {
            Ok(())
        }
        async fn query(
            &self,
            _collection: Collection,
            _text: &str,
            _k: usize,
            _filter: Option<&SearchFilter>,
        ) -> Result<Vec<ScoredMatch>> {
            Ok(Vec::new())
        }
        async fn course(&self, title: &str) -> Result<Option<CourseRecord>> {
            Ok(self.courses.iter().find(|c| c.title == title).cloned())
        }
        async fn course_titles(&self) -> Result<Vec<String>> {
            Ok(self.courses.iter().map(|c| c.title.clone()).collect())
        }
        async fn clear(&self) -> Result<()> {
            Ok(())
        }
    }

    fn tool(courses: Vec<CourseRecord>) -> CourseOutlineTool {
        let retriever = Retriever::new(Arc::new(StubIndex { courses }), &RetrievalConfig::default());
        CourseOutlineTool::new(Arc::new(retriever))
    }

    fn course() -> CourseRecord {
        CourseRecord {
            title: "Intro to MCP".into(),
            link: "https://example.com/mcp".into(),
            instructor: "Ada Lovelace".into(),
            lessons: vec![
                LessonSummary { number: 0, title: "Introduction".into(), link: None },
                LessonSummary {
                    number: 1,
                    title: "Why MCP".into(),
                    link: Some("https://example.com/mcp/1".into()),
                },
            ],
        }
    }

    #[tokio::test]
    async fn test_outline_lists_every_lesson() {
        let tool = tool(vec![course()]);
        let result = tool
            .execute(r#"{"course_name":"intro to mcp"}"#)
            .await
            .unwrap();
        assert!(result.output.contains("Course: Intro to MCP"));
        assert!(result.output.contains("Course Link: https://example.com/mcp"));
        assert!(result.output.contains("Instructor: Ada Lovelace"));
        assert!(result.output.contains("Lessons (2):"));
        assert!(result.output.contains("Lesson 0: Introduction"));
        assert!(result.output.contains("Lesson 1: Why MCP"));
    }

    #[tokio::test]
    async fn test_outline_source_cites_the_course_link() {
        let tool = tool(vec![course()]);
        let result = tool
            .execute(r#"{"course_name":"Intro to MCP"}"#)
            .await
            .unwrap();
        assert_eq!(result.sources.len(), 1);
        assert_eq!(result.sources[0].lesson_number, None);
        assert_eq!(result.sources[0].link.as_deref(), Some("https://example.com/mcp"));
        assert_eq!(tool.take_sources().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_course_is_tool_output() {
        let tool = tool(vec![]);
        let result = tool.execute(r#"{"course_name":"Ghost"}"#).await.unwrap();
        assert_eq!(result.output, "No course found matching 'Ghost'.");
        assert!(result.sources.is_empty());
    }
}
