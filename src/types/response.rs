//! Chat completion response.

use serde::{Deserialize, Serialize};

use super::extension::{wire_fields, ExtensionData};
use super::message::Message;
use super::tool::ToolCall;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub created: u64,
    pub choices: Vec<Choice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(flatten)]
    pub extension: ExtensionData,
}

wire_fields!(ChatResponse, ["id", "model", "created", "choices", "usage"]);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Choice {
    #[serde(default)]
    pub index: u32,
    pub message: Message,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    #[serde(flatten)]
    pub extension: ExtensionData,
}

wire_fields!(Choice, ["index", "message", "finish_reason"]);

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
    #[serde(flatten)]
    pub extension: ExtensionData,
}

wire_fields!(Usage, ["prompt_tokens", "completion_tokens", "total_tokens"]);

impl ChatResponse {
    /// Message of the first choice.
    pub fn message(&self) -> Option<&Message> {
        self.choices.first().map(|c| &c.message)
    }

    /// Text of the first choice, if any.
    pub fn content(&self) -> Option<String> {
        self.message().and_then(Message::text)
    }

    /// Tool calls requested by the first choice.
    pub fn tool_calls(&self) -> &[ToolCall] {
        self.message().map(|m| m.tool_calls.as_slice()).unwrap_or(&[])
    }

    pub fn finish_reason(&self) -> Option<&str> {
        self.choices.first().and_then(|c| c.finish_reason.as_deref())
    }
}
