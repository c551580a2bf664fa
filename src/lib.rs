//! # chatwire
//!
//! Protocol and transport core for OpenAI-compatible chat-completion APIs.
//!
//! ## Overview
//!
//! chatwire turns typed requests into HTTP calls and typed responses back out:
//! JSON and multipart request encoding, classification of every reply into a
//! success, a provider error, or a protocol failure, incremental decoding of
//! server-sent event streams, and a bounded tool-calling loop.
//!
//! ## Key Features
//!
//! - **Extension data**: every DTO carries an [`types::ExtensionData`] map whose
//!   keys are merged beside the declared fields on the wire, so unknown
//!   provider fields round-trip and new parameters can be sent before they
//!   are modeled.
//! - **Error classification**: one [`Error`] type separating transport,
//!   protocol, and provider ([`ApiError`]) failures.
//! - **Streaming**: [`ChatClient::chat_completion_stream`] yields
//!   [`types::StreamChunk`]s until `data: [DONE]`, honouring cancellation.
//! - **Tool calling**: [`tools::ToolCallOrchestrator`] runs tool calls from a
//!   [`tools::ToolRegistry`] and feeds results back, up to a round limit.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chatwire::types::{ChatRequest, Message};
//! use chatwire::ChatClient;
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> chatwire::Result<()> {
//!     let client = ChatClient::builder().api_key("your-api-key").build()?;
//!
//!     let request = ChatRequest::new("gpt-4o-mini", vec![Message::user("Hello!")]);
//!     let response = client.chat_completion(&request).await?;
//!     println!("{}", response.content().unwrap_or_default());
//!
//!     let mut stream = client.chat_completion_stream(&request.stream()).await?;
//!     while let Some(chunk) = stream.next().await {
//!         print!("{}", chunk?.content().unwrap_or(""));
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | `ChatClient`, its builder and response classification |
//! | [`codec`] | JSON and multipart request encoders |
//! | [`config`] | Client configuration (builder, env, YAML) |
//! | [`stream`] | SSE decoding and chunk accumulation |
//! | [`tools`] | Tool handlers, registry and orchestration loop |
//! | [`transport`] | Authenticated HTTP sending |
//! | [`types`] | Wire data types |

pub mod client;
pub mod codec;
pub mod config;
pub mod error_code;
pub mod stream;
pub mod tools;
pub mod transport;
pub mod types;

pub use client::{ChatClient, ChatClientBuilder};
pub use config::ClientConfig;
pub use error_code::ApiErrorCode;
pub use stream::ChunkStream;
pub use tokio_util::sync::CancellationToken;
pub use types::{ChatRequest, ChatResponse, ExtensionData, Message, StreamChunk, ToolCall};

use futures::Stream;
use std::pin::Pin;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// A pinned, boxed stream of `Result<T>`
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = Result<T>> + Send + 'a>>;

/// Error type for the library
pub mod error;
pub use error::{ApiError, BoxError, Error, ErrorContext, ErrorKind};
