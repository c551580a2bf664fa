//! Tool calling definitions.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::extension::{colliding_keys, wire_fields, ExtensionData, WireFields};

/// Tool advertised to the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: String, // "function"
    pub function: FunctionDefinition,
    #[serde(flatten)]
    pub extension: ExtensionData,
}

wire_fields!(ToolDefinition, ["type", "function"]);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema of the arguments object. `null` is advertised as an empty object schema.
    #[serde(default = "empty_object_schema")]
    pub parameters: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
    #[serde(flatten)]
    pub extension: ExtensionData,
}

wire_fields!(FunctionDefinition, ["name", "description", "parameters", "strict"]);

/// Schema of a tool that takes no arguments.
pub fn empty_object_schema() -> Value {
    json!({"type": "object", "properties": {}})
}

impl ToolDefinition {
    pub fn function(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        let parameters = if parameters.is_null() {
            empty_object_schema()
        } else {
            parameters
        };
        Self {
            tool_type: function_type(),
            function: FunctionDefinition {
                name: name.into(),
                description: Some(description.into()),
                parameters,
                strict: None,
                extension: ExtensionData::new(),
            },
            extension: ExtensionData::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }

    pub(crate) fn collisions_at(&self, prefix: &str) -> Vec<String> {
        let mut keys = colliding_keys(Self::FIELDS, &self.extension, prefix);
        keys.extend(colliding_keys(
            FunctionDefinition::FIELDS,
            &self.function.extension,
            &format!("{}function.", prefix),
        ));
        keys
    }
}

/// Tool invocation requested by the model.
///
/// Provider fields beside `id`/`type`/`function` (opaque signatures and the
/// like) are kept in `extension` and sent back with the assistant turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// Provider-assigned, opaque.
    pub id: String,
    #[serde(rename = "type", default = "function_type")]
    pub call_type: String,
    pub function: FunctionCall,
    #[serde(flatten)]
    pub extension: ExtensionData,
}

wire_fields!(ToolCall, ["id", "type", "function"]);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    /// Serialized JSON arguments, opaque until parsed by the tool.
    #[serde(default)]
    pub arguments: String,
    #[serde(flatten)]
    pub extension: ExtensionData,
}

wire_fields!(FunctionCall, ["name", "arguments"]);

fn function_type() -> String {
    "function".to_string()
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            call_type: function_type(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
                extension: ExtensionData::new(),
            },
            extension: ExtensionData::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }

    pub fn arguments(&self) -> &str {
        &self.function.arguments
    }

    pub(crate) fn collisions_at(&self, prefix: &str) -> Vec<String> {
        let mut keys = colliding_keys(Self::FIELDS, &self.extension, prefix);
        keys.extend(colliding_keys(
            FunctionCall::FIELDS,
            &self.function.extension,
            &format!("{}function.", prefix),
        ));
        keys
    }
}

/// Streaming fragment of a tool call; fragments with the same `index` belong together.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ToolCallDelta {
    #[serde(default)]
    pub index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub call_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<FunctionCallDelta>,
    #[serde(flatten)]
    pub extension: ExtensionData,
}

wire_fields!(ToolCallDelta, ["index", "id", "type", "function"]);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FunctionCallDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

/// Tool-selection policy: `"auto"`, `"none"`, `"required"`, or a named function.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ToolChoice {
    Mode(ToolChoiceMode),
    Named(NamedToolChoice),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoiceMode {
    Auto,
    None,
    Required,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NamedToolChoice {
    #[serde(rename = "type")]
    pub choice_type: String,
    pub function: NamedFunction,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NamedFunction {
    pub name: String,
}

impl ToolChoice {
    pub fn auto() -> Self {
        ToolChoice::Mode(ToolChoiceMode::Auto)
    }

    pub fn none() -> Self {
        ToolChoice::Mode(ToolChoiceMode::None)
    }

    pub fn required() -> Self {
        ToolChoice::Mode(ToolChoiceMode::Required)
    }

    pub fn function(name: impl Into<String>) -> Self {
        ToolChoice::Named(NamedToolChoice {
            choice_type: function_type(),
            function: NamedFunction { name: name.into() },
        })
    }
}
