//! Retrieval tools the generation model can invoke.
//!
//! Tools are the only bridge between the model and the index. Each tool
//! records citation sources as it runs; the orchestrator drains them
//! after every query so citations never leak across queries.

pub mod outline;
pub mod registry;
pub mod search;

pub use outline::CourseOutlineTool;
pub use registry::ToolRegistry;
pub use search::CourseSearchTool;
