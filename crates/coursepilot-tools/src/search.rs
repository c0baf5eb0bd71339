//! Semantic course-content search, exposed to the model as
//! `search_course_content`.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use coursepilot_core::error::{CoursePilotError, Result};
use coursepilot_core::traits::Tool;
use coursepilot_core::types::{SourceRecord, ToolDefinition, ToolResult};
use coursepilot_index::Retriever;

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default)]
    course_name: Option<String>,
    #[serde(default)]
    lesson_number: Option<u32>,
}

/// Searches chunk content, optionally narrowed to a course and lesson.
///
/// Course names are resolved fuzzily before filtering, so the model may
/// pass partial titles ("MCP course"). A name that resolves to nothing,
/// or a search with no hits, produces an explanatory output string — the
/// model reads it and answers accordingly.
pub struct CourseSearchTool {
    retriever: Arc<Retriever>,
    last_sources: Mutex<Vec<SourceRecord>>,
}

impl CourseSearchTool {
    pub fn new(retriever: Arc<Retriever>) -> Self {
        Self { retriever, last_sources: Mutex::new(Vec::new()) }
    }

    fn empty_message(course: Option<&str>, lesson: Option<u32>) -> String {
        let mut msg = String::from("No relevant content found");
        if let Some(course) = course {
            msg.push_str(&format!(" in course '{course}'"));
        }
        if let Some(lesson) = lesson {
            msg.push_str(&format!(" in lesson {lesson}"));
        }
        msg.push('.');
        msg
    }
}

#[async_trait]
impl Tool for CourseSearchTool {
    fn name(&self) -> &str {
        "search_course_content"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "search_course_content".into(),
            description: "Search course materials with smart course name matching \
                          and lesson filtering"
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "What to search for in course content"
                    },
                    "course_name": {
                        "type": "string",
                        "description": "Course title (partial matches work, e.g. 'MCP')"
                    },
                    "lesson_number": {
                        "type": "integer",
                        "description": "Specific lesson number to search within"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn execute(&self, arguments: &str) -> Result<ToolResult> {
        let args: SearchArgs = serde_json::from_str(arguments)
            .map_err(|e| CoursePilotError::Tool(format!("search_course_content: {e}")))?;

        // Fuzzy name first, so a bad reference fails before any search
        let resolved = match &args.course_name {
            Some(name) => match self.retriever.resolve_course_name(name).await? {
                Some(title) => Some(title),
                None => {
                    return Ok(ToolResult {
                        output: format!("No course found matching '{name}'."),
                        sources: Vec::new(),
                    });
                }
            },
            None => None,
        };

        let chunks = self
            .retriever
            .search(&args.query, resolved.as_deref(), args.lesson_number, None)
            .await?;

        if chunks.is_empty() {
            return Ok(ToolResult {
                output: Self::empty_message(resolved.as_deref(), args.lesson_number),
                sources: Vec::new(),
            });
        }

        let mut sections = Vec::with_capacity(chunks.len());
        let mut sources = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            sections.push(format!("[{}]\n{}", chunk.source.label(), chunk.text));
            sources.push(chunk.source);
        }

        self.last_sources.lock().unwrap().extend(sources.clone());
        Ok(ToolResult { output: sections.join("\n\n"), sources })
    }

    fn take_sources(&self) -> Vec<SourceRecord> {
        std::mem::take(&mut self.last_sources.lock().unwrap())
    }

    fn reset_sources(&self) {
        self.last_sources.lock().unwrap().clear();
    }
}
