//! # storyboard - Manga Storyboard Workflow Engine
//!
//! Turns a story summary into per-scene image-generation prompts through a
//! persisted workflow. This crate is the entry point: it loads the layered
//! configuration, installs logging and builds an [`Engine`] that hands out
//! the project service, the refinement pipeline and per-session agent tools.
//!
//! The building blocks live in their own crates and are re-exported here:
//!
//! - [`checkpoint`]: project checkpoints and the memory/SQLite stores
//! - [`workflow`]: state machine, scene lifecycle, refinement and export
//! - [`llm`]: generation providers (chat completions and Gemini)
//! - [`agent`]: JSON tool protocol for conversational agents
//!
//! ```rust,no_run
//! use serde_json::json;
//! use storyboard::{logging, ConfigLoader, Engine, ToolScope};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::new().load().await?;
//!     logging::init(&config.logging);
//!
//!     let engine = Engine::from_config(config).await?;
//!     let tools = engine.tools(ToolScope::for_thread("thread-1"));
//!     let result = tools.execute("create_project", json!({"title": "Lighthouse"})).await?;
//!     println!("{}", result.message.unwrap_or_default());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod engine;
pub mod logging;

pub use storyboard_agent as agent;
pub use storyboard_checkpoint as checkpoint;
pub use storyboard_llm as llm;
pub use storyboard_workflow as workflow;

pub use config::{ConfigError, ConfigLoader, GenerationConfig, LoggingConfig, StoryboardConfig};
pub use engine::Engine;
pub use storyboard_agent::{ToolRegistry, ToolResult, ToolScope};
pub use storyboard_checkpoint::{StoreBackend, StoreConfig};
