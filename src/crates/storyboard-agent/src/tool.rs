//! Tool trait and registry
//!
//! # Example
//!
//! ```rust
//! use storyboard_agent::{Tool, ToolResult};
//! use async_trait::async_trait;
//! use serde_json::{json, Value};
//!
//! struct EchoTool;
//!
//! #[async_trait]
//! impl Tool for EchoTool {
//!     fn name(&self) -> &str {
//!         "echo"
//!     }
//!
//!     fn description(&self) -> &str {
//!         "Echoes its input"
//!     }
//!
//!     fn input_schema(&self) -> Value {
//!         json!({"type": "object"})
//!     }
//!
//!     async fn execute(&self, input: Value) -> storyboard_agent::Result<ToolResult> {
//!         Ok(ToolResult::success(input, "echoed"))
//!     }
//! }
//! ```

use crate::error::{AgentError, Result};
use crate::result::ToolResult;
use async_trait::async_trait;
use jsonschema::JSONSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{info, warn};

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the tool input
    fn input_schema(&self) -> Value;

    async fn execute(&self, input: Value) -> Result<ToolResult>;

    /// Validate `input` against [`Tool::input_schema`]
    fn validate_input(&self, input: &Value) -> Result<()> {
        validate_against(&self.input_schema(), input)
    }
}

/// Validate `input` against a JSON schema, joining all violations
pub fn validate_against(schema: &Value, input: &Value) -> Result<()> {
    let compiled = JSONSchema::compile(schema)
        .map_err(|e| AgentError::InvalidInput(format!("Invalid JSON Schema: {}", e)))?;

    // Collect messages while the compiled schema is alive
    let messages = match compiled.validate(input) {
        Ok(()) => None,
        Err(errors) => Some(
            errors
                .map(|e| format!("{}: {}", e.instance_path, e))
                .collect::<Vec<String>>(),
        ),
    };

    match messages {
        Some(messages) => Err(AgentError::InvalidInput(messages.join("; "))),
        None => Ok(()),
    }
}

/// Tool metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolMetadata {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Tools by name
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Tool names, sorted
    pub fn list_tools(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Metadata for all tools, sorted by name
    pub fn list_metadata(&self) -> Vec<ToolMetadata> {
        let mut metadata: Vec<ToolMetadata> = self
            .tools
            .values()
            .map(|tool| ToolMetadata {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                input_schema: tool.input_schema(),
            })
            .collect();
        metadata.sort_by(|a, b| a.name.cmp(&b.name));
        metadata
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute a tool by name
    ///
    /// An unknown name is an error. Input that fails schema validation is a
    /// failed [`ToolResult`] and the tool does not run.
    pub async fn execute(&self, name: &str, input: Value) -> Result<ToolResult> {
        let tool = self
            .get(name)
            .ok_or_else(|| AgentError::ToolNotFound(name.to_string()))?;

        if let Err(e) = tool.validate_input(&input) {
            warn!(tool = %name, error = %e, "Rejected tool input");
            return Ok(ToolResult::failure(e.to_string()));
        }

        info!(tool = %name, "Executing tool");
        let result = tool.execute(input).await?;
        info!(tool = %name, success = result.success, "Tool finished");
        Ok(result)
    }
}
