//! The tool seam — schema-described, side-effect-free operations the
//! generation model may invoke before producing a final answer.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{SourceRecord, ToolDefinition, ToolResult};

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    /// Schema sent to the model.
    fn definition(&self) -> ToolDefinition;

    /// Execute with JSON-encoded arguments. Recoverable conditions
    /// ("no such course", empty results) are ordinary output strings,
    /// never errors — the model is expected to read them and adapt.
    async fn execute(&self, arguments: &str) -> Result<ToolResult>;

    /// Drain the sources recorded by executions since the last drain.
    /// Tools that cite nothing keep the default.
    fn take_sources(&self) -> Vec<SourceRecord> {
        Vec::new()
    }

    /// Discard any recorded sources. Called at the start of every query.
    fn reset_sources(&self) {}
}
