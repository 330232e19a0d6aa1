//! # storyboard-agent - Agent Tool Protocol
//!
//! Exposes the storyboard workflow to a conversational agent as seven JSON
//! tools. Tools of one session share a [`ToolScope`] holding the
//! `(thread_id, project_id)` the conversation is bound to; independent
//! sessions use independent scopes.
//!
//! Every invocation returns a [`ToolResult`]. Invalid input, a missing
//! project, unmet preconditions and generation failures are failed results;
//! only an unknown tool name or a persistence failure is an [`AgentError`].
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use serde_json::json;
//! use storyboard_agent::{create_agent_tools, AgentToolOptions, ToolScope};
//! use storyboard_checkpoint::InMemoryCheckpointStore;
//! use storyboard_workflow::testing::MockGenerator;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let tools = create_agent_tools(
//!         Arc::new(InMemoryCheckpointStore::new()),
//!         Arc::new(MockGenerator::new()),
//!         ToolScope::for_thread("thread-1"),
//!         AgentToolOptions::default(),
//!     );
//!
//!     let result = tools.execute("create_project", json!({"title": "Lighthouse"})).await?;
//!     assert!(result.success);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod result;
pub mod scope;
pub mod tool;
pub mod tools;

pub use error::{AgentError, Result};
pub use result::ToolResult;
pub use scope::{ScopeState, ToolScope};
pub use tool::{validate_against, Tool, ToolMetadata, ToolRegistry};
pub use tools::{create_agent_tools, AgentToolOptions};
