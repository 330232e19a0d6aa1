//! Uniform tool result shape

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result returned by every tool invocation
///
/// Serialises as `{success, data?, error?, message?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ToolResult {
    pub fn success(data: Value, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: Some(message.into()),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            message: None,
        }
    }

    /// Field of `data`, if any
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.as_ref().and_then(|data| data.get(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_failure_omits_empty_fields() {
        let value = serde_json::to_value(ToolResult::failure("nope")).unwrap();
        assert_eq!(value, json!({"success": false, "error": "nope"}));
    }

    #[test]
    fn test_success_shape() {
        let result = ToolResult::success(json!({"projectId": "p1"}), "done");
        assert_eq!(result.get("projectId"), Some(&json!("p1")));

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["message"], "done");
        assert!(value.get("error").is_none());
    }
}
