//! Wire data types.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`request`] | Chat completion request |
//! | [`response`] | Chat completion response and usage |
//! | [`chunk`] | Streaming chunks and deltas |
//! | [`message`] | Messages, roles and multi-part content |
//! | [`tool`] | Tool definitions, calls and tool choice |
//! | [`envelope`] | Provider error envelope |
//! | [`extension`] | Extension data for undeclared wire fields |
//! | [`embedding`], [`audio`] | Secondary endpoints |
//!
//! ```rust
//! use chatwire::types::{ChatRequest, Message, ToolDefinition};
//!
//! let request = ChatRequest::new("gpt-4o-mini", vec![Message::user("What's the weather?")])
//!     .tools(vec![ToolDefinition::function(
//!         "get_weather",
//!         "Get current weather for a location",
//!         serde_json::json!({
//!             "type": "object",
//!             "properties": {"location": {"type": "string"}}
//!         }),
//!     )])
//!     .extension("service_tier", "flex");
//!
//! let wire = serde_json::to_value(&request).unwrap();
//! assert_eq!(wire["service_tier"], "flex");
//! ```

pub mod audio;
pub mod chunk;
pub mod embedding;
pub mod envelope;
pub mod extension;
pub mod message;
pub mod request;
pub mod response;
pub mod tool;

pub use audio::{SpeechRequest, Transcription, TranscriptionRequest};
pub use chunk::{ChunkChoice, Delta, StreamChunk};
pub use embedding::{Embedding, EmbeddingInput, EmbeddingRequest, EmbeddingResponse};
pub use envelope::{ErrorBody, ErrorEnvelope};
pub use extension::{ExtensionData, WireFields};
pub use message::{Content, ContentPart, Message, Role};
pub use request::{ChatRequest, StreamOptions};
pub use response::{ChatResponse, Choice, Usage};
pub use tool::{
    FunctionCall, FunctionCallDelta, FunctionDefinition, ToolCall, ToolCallDelta, ToolChoice,
    ToolDefinition,
};
