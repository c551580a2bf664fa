//! Chat completions client.
//!
//! Encoding, transport, and classification are split into submodules under
//! `src/client/`; callers normally only need [`ChatClient`] and its builder.

pub mod builder;
pub mod classify;
pub mod core;

pub use builder::ChatClientBuilder;
pub use classify::ResponseMeta;
pub use core::{
    ChatClient, CHAT_COMPLETIONS_PATH, EMBEDDINGS_PATH, SPEECH_PATH, TRANSCRIPTIONS_PATH,
};
