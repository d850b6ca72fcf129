use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tool definition as advertised in `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tool {
    /// Tool name (unique identifier)
    pub name: String,

    /// Human-readable description
    pub description: String,

    /// JSON Schema for input parameters
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,

    /// Declared parameter metadata
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub parameters: Vec<ToolParameter>,

    /// Free-form classification tags
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tags: Vec<String>,

    /// Tool version string
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl Tool {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: serde_json::json!({"type": "object"}),
            parameters: Vec::new(),
            tags: Vec::new(),
            version: None,
        }
    }

    pub fn with_input_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }

    pub fn with_parameter(mut self, parameter: ToolParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

/// Declared metadata for a single tool parameter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolParameter {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
}

/// `tools/call` request params.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallRequest {
    /// Tool name to call
    pub name: String,

    /// Arguments to pass to the tool
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
}

/// `tools/call` result.
///
/// `is_error: Some(true)` is a *success* response reporting a tool-level
/// failure; protocol errors never travel this way.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallResponse {
    /// Tool execution result
    pub content: Vec<ToolContent>,

    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl ToolCallResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::text(text)],
            is_error: None,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::text(text)],
            is_error: Some(true),
        }
    }
}

/// Tool content (result of tool execution)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ToolContent {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(rename = "image")]
    Image {
        data: String, // Base64 encoded
        #[serde(rename = "mimeType")]
        mime_type: String,
    },

    #[serde(rename = "resource")]
    Resource { uri: String },
}

impl ToolContent {
    pub fn text(text: impl Into<String>) -> Self {
        ToolContent::Text { text: text.into() }
    }
}

/// `tools/list` request params.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ListToolsRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

/// `tools/list` result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListToolsResponse {
    pub tools: Vec<Tool>,

    #[serde(rename = "nextCursor", skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_wire_shape() {
        let tool = Tool::new("add_note", "Add a note")
            .with_input_schema(json!({"type": "object", "properties": {"text": {"type": "string"}}}))
            .with_version("1.2.0");
        let wire = serde_json::to_value(&tool).unwrap();
        assert_eq!(wire["inputSchema"]["type"], json!("object"));
        assert!(wire.get("parameters").is_none());
        assert_eq!(wire["version"], json!("1.2.0"));
    }

    #[test]
    fn test_tool_result_error_flag() {
        let ok = ToolCallResponse::text("done");
        assert!(ok.is_error.is_none());

        let failed = ToolCallResponse::error("disk full");
        let wire = serde_json::to_value(&failed).unwrap();
        assert_eq!(wire["isError"], json!(true));
        assert_eq!(wire["content"][0]["type"], json!("text"));
    }

    #[test]
    fn test_tool_content_tagging() {
        let content = ToolContent::Image {
            data: "aGk=".to_string(),
            mime_type: "image/png".to_string(),
        };
        let wire = serde_json::to_value(&content).unwrap();
        assert_eq!(wire["type"], json!("image"));
        assert_eq!(wire["mimeType"], json!("image/png"));
    }
}
