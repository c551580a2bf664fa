//! Streaming responses.
//!
//! [`decode_sse`] turns a byte stream into a [`ChunkStream`]; the
//! [`ChunkAccumulator`] folds chunks back into a complete response.

pub mod accumulate;
pub mod decode;

pub use accumulate::{ChunkAccumulator, ToolCallAssembler};
pub use decode::{decode_sse, ChunkStream, DONE_SENTINEL};
