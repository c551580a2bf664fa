//! Streaming chunks (`chat.completion.chunk`).

use serde::{Deserialize, Serialize};

use super::extension::{wire_fields, ExtensionData};
use super::message::Role;
use super::response::Usage;
use super::tool::ToolCallDelta;

/// One incremental fragment of a streamed response.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StreamChunk {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub created: u64,
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    /// Usage totals, typically only on the final chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(flatten)]
    pub extension: ExtensionData,
}

wire_fields!(StreamChunk, ["id", "model", "created", "choices", "usage"]);

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChunkChoice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub delta: Delta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    #[serde(flatten)]
    pub extension: ExtensionData,
}

wire_fields!(ChunkChoice, ["index", "delta", "finish_reason"]);

/// Partial message fragment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Delta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallDelta>,
    #[serde(flatten)]
    pub extension: ExtensionData,
}

wire_fields!(Delta, ["role", "content", "tool_calls"]);

impl StreamChunk {
    /// Content delta of the first choice.
    pub fn content(&self) -> Option<&str> {
        self.choices.first().and_then(|c| c.delta.content.as_deref())
    }

    pub fn finish_reason(&self) -> Option<&str> {
        self.choices.iter().find_map(|c| c.finish_reason.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_chunk_decodes() {
        let chunk: StreamChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{"content":"Hi"}}]}"#).unwrap();
        assert_eq!(chunk.content(), Some("Hi"));
        assert_eq!(chunk.choices[0].index, 0);
        assert!(chunk.usage.is_none());
    }

    #[test]
    fn test_usage_only_chunk() {
        let chunk: StreamChunk = serde_json::from_str(
            r#"{"id":"c","choices":[],"usage":{"prompt_tokens":5,"completion_tokens":2,"total_tokens":7}}"#,
        )
        .unwrap();
        assert_eq!(chunk.content(), None);
        assert_eq!(chunk.usage.unwrap().completion_tokens, 2);
    }

    #[test]
    fn test_unknown_delta_fields_are_kept() {
        let chunk: StreamChunk = serde_json::from_str(
            r#"{"choices":[{"index":0,"delta":{"reasoning_content":"thinking"},"finish_reason":null}]}"#,
        )
        .unwrap();
        assert_eq!(
            chunk.choices[0].delta.extension.get("reasoning_content"),
            Some(&serde_json::json!("thinking"))
        );
    }
}
