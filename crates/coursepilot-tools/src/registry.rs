//! Tool registry — dynamic tool discovery, validation, and execution.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use coursepilot_core::error::{CoursePilotError, Result};
use coursepilot_core::traits::Tool;
use coursepilot_core::types::{SourceRecord, ToolDefinition, ToolResult, dedup_sources};

/// Holds the tools exposed to the model for one system instance.
///
/// Sources are recorded here at execution time so that draining them
/// preserves the order tools actually ran in, not tool-name order.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    recorded: Mutex<Vec<SourceRecord>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// All tool schemas, for the model request.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self.tools.values().map(|t| t.definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Execute a named tool. Unknown names and malformed arguments are
    /// errors; the generation loop turns them into tool-result strings.
    pub async fn execute(&self, name: &str, arguments: &str) -> Result<ToolResult> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| CoursePilotError::Tool(format!("unknown tool: {name}")))?;

        let args: serde_json::Value = serde_json::from_str(arguments)
            .map_err(|e| CoursePilotError::Tool(format!("{name}: invalid arguments: {e}")))?;
        validate_args(&tool.definition(), &args)
            .map_err(|e| CoursePilotError::Tool(format!("{name}: {e}")))?;

        tracing::debug!(tool = name, "executing tool");
        let result = tool.execute(arguments).await?;
        self.recorded.lock().unwrap().extend(result.sources.iter().cloned());
        Ok(result)
    }

    /// Drain sources recorded since the last drain, deduplicated, in
    /// invocation order.
    pub fn take_sources(&self) -> Vec<SourceRecord> {
        let sources = std::mem::take(&mut *self.recorded.lock().unwrap());
        dedup_sources(sources)
    }

    /// Discard recorded sources, here and on every tool.
    pub fn reset_sources(&self) {
        self.recorded.lock().unwrap().clear();
        for tool in self.tools.values() {
            tool.reset_sources();
        }
    }
}

/// Validate that a tool call supplies every required argument.
pub fn validate_args(
    definition: &ToolDefinition,
    args: &serde_json::Value,
) -> std::result::Result<(), String> {
    if let Some(required) = definition.parameters.get("required").and_then(|r| r.as_array()) {
        for req in required {
            if let Some(key) = req.as_str() {
                if args.get(key).is_none() {
                    return Err(format!("missing required argument: {key}"));
                }
            }
        }
    }
    Ok(())
}
