//! Multi-round tool-calling loop.

use futures::{stream, StreamExt, TryStreamExt};
use std::sync::Arc;
use tracing::{debug, info};

use crate::client::ChatClient;
use crate::tools::registry::ToolRegistry;
use crate::types::{ChatRequest, ChatResponse, Message, Role};
use crate::{Error, Result};

pub const DEFAULT_MAX_ROUNDS: usize = 5;
pub const DEFAULT_MAX_PARALLEL_TOOLS: usize = 8;

/// Drives request -> tool calls -> tool results -> request until the model
/// answers without calling a tool.
///
/// The conversation is the request's own `messages`: assistant turns and tool
/// results are appended to it, so the caller sees the full exchange afterwards.
pub struct ToolCallOrchestrator {
    client: ChatClient,
    registry: Arc<ToolRegistry>,
    max_rounds: usize,
    max_parallel_tools: usize,
}

impl ToolCallOrchestrator {
    pub fn new(client: ChatClient, registry: impl Into<Arc<ToolRegistry>>) -> Self {
        Self {
            client,
            registry: registry.into(),
            max_rounds: DEFAULT_MAX_ROUNDS,
            max_parallel_tools: DEFAULT_MAX_PARALLEL_TOOLS,
        }
    }

    /// Maximum number of model requests per call.
    pub fn max_rounds(mut self, rounds: usize) -> Self {
        self.max_rounds = rounds;
        self
    }

    /// Maximum number of tool calls of one round executed at once.
    pub fn max_parallel_tools(mut self, n: usize) -> Self {
        self.max_parallel_tools = n.max(1);
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Run the loop on `request`, returning the first response without tool calls.
    ///
    /// Fails with `Error::BoundedRounds` when every one of `max_rounds`
    /// responses still asked for tools.
    pub async fn complete_with_tools(&self, request: &mut ChatRequest) -> Result<ChatResponse> {
        if request.tools.is_empty() {
            request.tools = self.registry.schemas();
        }

        for round in 1..=self.max_rounds {
            let response = self.client.chat_completion(request).await?;
            let calls = response.tool_calls().to_vec();
            if calls.is_empty() {
                debug!(round, "model answered without tool calls");
                return Ok(response);
            }

            info!(round, tool_calls = calls.len(), "executing tool calls");
            let cancel = self.client.cancellation_token();
            let registry = &self.registry;
            let outputs: Vec<String> = stream::iter(calls.iter())
                .map(|call| registry.execute(call, cancel))
                .buffered(self.max_parallel_tools)
                .try_collect()
                .await?;

            let mut assistant = response
                .message()
                .cloned()
                .unwrap_or_else(|| Message::assistant_tool_calls(None, Vec::new()));
            assistant.role = Role::Assistant;
            assistant.tool_calls = calls.clone();
            request.messages.push(assistant);

            for (call, output) in calls.iter().zip(outputs) {
                request.messages.push(Message::tool(call.id.clone(), output));
            }
        }

        Err(Error::BoundedRounds {
            max_rounds: self.max_rounds,
        })
    }
}
