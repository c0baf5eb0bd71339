//! Trait seams between pipeline components.

pub mod index;
pub mod provider;
pub mod tool;

pub use index::VectorIndex;
pub use provider::Provider;
pub use tool::Tool;
