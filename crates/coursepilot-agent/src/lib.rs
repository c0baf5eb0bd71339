//! Query orchestration: wires ingestion, retrieval, tools, memory, and
//! the generation loop into one façade.

pub mod generator;

use std::path::Path;
use std::sync::Arc;

use coursepilot_core::config::CoursePilotConfig;
use coursepilot_core::error::{CoursePilotError, Result};
use coursepilot_core::traits::{Provider, VectorIndex};
use coursepilot_core::types::{Course, CourseRecord, SourceRecord};
use coursepilot_index::Retriever;
use coursepilot_ingest::{chunk_lesson, parse_file};
use coursepilot_memory::SessionStore;
use coursepilot_tools::{CourseOutlineTool, CourseSearchTool, ToolRegistry};

pub use generator::Generator;

/// The answer to one query with the sources its tools consulted.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub answer: String,
    pub sources: Vec<SourceRecord>,
}

/// Catalog totals for the stats surface.
#[derive(Debug, Clone)]
pub struct Analytics {
    pub total_courses: usize,
    pub course_titles: Vec<String>,
}

/// The top-level system. One instance serves many sessions.
pub struct RagSystem {
    config: CoursePilotConfig,
    index: Arc<dyn VectorIndex>,
    tools: ToolRegistry,
    generator: Generator,
    sessions: SessionStore,
}

impl RagSystem {
    pub fn new(
        config: CoursePilotConfig,
        index: Arc<dyn VectorIndex>,
        provider: Arc<dyn Provider>,
    ) -> Self {
        let retriever = Arc::new(Retriever::new(index.clone(), &config.retrieval));
        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(CourseSearchTool::new(retriever.clone())));
        tools.register(Arc::new(CourseOutlineTool::new(retriever)));

        let generator = Generator::new(
            provider,
            config.default_model.clone(),
            config.default_temperature,
            &config.generation,
        );
        let sessions = SessionStore::new(&config.session);

        Self { config, index, tools, generator, sessions }
    }

    /// Start a fresh conversation session.
    pub fn create_session(&self) -> String {
        self.sessions.create_session()
    }

    /// Forget a session's conversation history.
    pub fn clear_session(&self, session_id: &str) {
        self.sessions.clear_session(session_id);
    }

    /// Answer a query inside a session. Sources are drained per query:
    /// whatever the tools cited here, and nothing from earlier queries.
    pub async fn answer(&self, session_id: &str, query: &str) -> Result<QueryOutcome> {
        self.tools.reset_sources();
        let history = self.sessions.history_text(session_id);

        let answer = self
            .generator
            .generate(query, history.as_deref(), &self.tools)
            .await?;

        let sources = self.tools.take_sources();
        self.sessions.append_exchange(session_id, query, &answer);
        tracing::info!(session_id, sources = sources.len(), "query answered");
        Ok(QueryOutcome { answer, sources })
    }

    /// Parse and index one course document. A course whose title is
    /// already present is skipped (returns chunk count 0).
    pub async fn add_course_document(&self, path: &Path) -> Result<(Course, usize)> {
        let course = parse_file(path)?;

        let existing = self.index.course_titles().await?;
        if existing.iter().any(|t| t == &course.title) {
            tracing::info!(course = %course.title, "already indexed, skipping");
            return Ok((course, 0));
        }

        let chunks: Vec<_> = course
            .lessons
            .iter()
            .flat_map(|lesson| {
                chunk_lesson(&self.config.chunking, &course.title, lesson.number, &lesson.body)
            })
            .collect();
        let count = chunks.len();

        self.index.insert_course(CourseRecord::from_course(&course)).await?;
        self.index.insert_chunks(chunks).await?;
        tracing::info!(course = %course.title, chunks = count, "course indexed");
        Ok((course, count))
    }

    /// Index every `.txt` document in a folder. Files that fail to parse
    /// are logged and skipped; the rest of the batch still loads. With
    /// `rebuild` the index is cleared first.
    pub async fn add_course_folder(&self, dir: &Path, rebuild: bool) -> Result<(usize, usize)> {
        if rebuild {
            self.index.clear().await?;
        }
        if !dir.is_dir() {
            return Err(CoursePilotError::Ingestion(format!(
                "not a directory: {}",
                dir.display()
            )));
        }

        let mut entries: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "txt"))
            .collect();
        entries.sort();

        let mut courses = 0;
        let mut chunks = 0;
        for path in entries {
            match self.add_course_document(&path).await {
                Ok((_, 0)) => {}
                Ok((_, n)) => {
                    courses += 1;
                    chunks += n;
                }
                Err(e) => {
                    tracing::warn!(file = %path.display(), error = %e, "skipping document");
                }
            }
        }
        Ok((courses, chunks))
    }

    /// Catalog totals.
    pub async fn analytics(&self) -> Result<Analytics> {
        let course_titles = self.index.course_titles().await?;
        Ok(Analytics { total_courses: course_titles.len(), course_titles })
    }
}
