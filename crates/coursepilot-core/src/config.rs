//! CoursePilot configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoursePilotConfig {
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_provider")]
    pub default_provider: String,
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub index: IndexConfig,
}

fn default_api_key() -> String { String::new() }
fn default_provider() -> String { "anthropic".into() }
fn default_model() -> String { "claude-sonnet-4-20250514".into() }
fn default_temperature() -> f32 { 0.0 }

impl Default for CoursePilotConfig {
    fn default() -> Self {
        Self {
            api_key: default_api_key(),
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            session: SessionConfig::default(),
            generation: GenerationConfig::default(),
            index: IndexConfig::default(),
        }
    }
}

impl CoursePilotConfig {
    /// Load config from the default path (~/.coursepilot/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::error::CoursePilotError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| crate::error::CoursePilotError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that violate structural invariants.
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(crate::error::CoursePilotError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.retrieval.max_results == 0 {
            return Err(crate::error::CoursePilotError::Config(
                "max_results must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the CoursePilot home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".coursepilot")
    }
}

/// Chunker configuration (units are characters).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

fn default_chunk_size() -> usize { 800 }
fn default_chunk_overlap() -> usize { 100 }

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

/// Retrieval configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Fixed result cap for chunk search. Never caller-unbounded.
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// Minimum confidence (0..1) for accepting a fuzzy course-name match.
    #[serde(default = "default_min_course_confidence")]
    pub min_course_confidence: f32,
}

fn default_max_results() -> usize { 5 }
fn default_min_course_confidence() -> f32 { 0.3 }

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            min_course_confidence: default_min_course_confidence(),
        }
    }
}

/// Session memory configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Number of past exchanges kept per session (2 entries each).
    #[serde(default = "default_max_history")]
    pub max_history: usize,
}

fn default_max_history() -> usize { 2 }

impl Default for SessionConfig {
    fn default() -> Self {
        Self { max_history: default_max_history() }
    }
}

/// Generation loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Hard cap on tool-invocation rounds per query.
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Bound on a single model call; elapsing surfaces a generation failure.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_max_tool_rounds() -> usize { 1 }
fn default_max_tokens() -> u32 { 800 }
fn default_timeout_secs() -> u64 { 120 }

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: default_max_tool_rounds(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Index storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// SQLite database path. Empty string = ~/.coursepilot/index.db.
    #[serde(default)]
    pub path: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self { path: String::new() }
    }
}

impl IndexConfig {
    pub fn resolved_path(&self) -> PathBuf {
        if self.path.is_empty() {
            CoursePilotConfig::home_dir().join("index.db")
        } else {
            PathBuf::from(&self.path)
        }
    }
}
