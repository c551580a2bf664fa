//! Fold streamed chunks back into a complete `ChatResponse`.

use std::collections::BTreeMap;

use crate::types::{
    ChatResponse, Choice, Content, ExtensionData, Message, Role, StreamChunk, ToolCall,
    ToolCallDelta, Usage,
};

#[derive(Default)]
struct ChoiceState {
    role: Option<Role>,
    content: String,
    saw_content: bool,
    finish_reason: Option<String>,
    tool_calls: ToolCallAssembler,
}

/// Collects tool-call fragments into complete calls, keyed by their stream index.
///
/// The id and name arrive on the first fragment of a call; later fragments
/// only append to the argument string.
#[derive(Default)]
pub struct ToolCallAssembler {
    calls: BTreeMap<u32, ToolCall>,
}

impl ToolCallAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, delta: &ToolCallDelta) {
        let call = self
            .calls
            .entry(delta.index)
            .or_insert_with(|| ToolCall::new(String::new(), String::new(), String::new()));

        if let Some(id) = delta.id.as_deref().filter(|id| !id.is_empty()) {
            call.id = id.to_string();
        }
        if let Some(kind) = &delta.call_type {
            call.call_type = kind.clone();
        }
        for (key, value) in delta.extension.iter() {
            call.extension.insert(key.clone(), value.clone());
        }
        if let Some(function) = &delta.function {
            if let Some(name) = function.name.as_deref().filter(|n| !n.is_empty()) {
                call.function.name = name.to_string();
            }
            if let Some(fragment) = &function.arguments {
                call.function.arguments.push_str(fragment);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Completed calls in index order. Arguments stay as received, even if not valid JSON.
    pub fn finalize(self) -> Vec<ToolCall> {
        self.calls.into_values().collect()
    }
}

/// Incremental builder of a `ChatResponse` from `StreamChunk`s.
#[derive(Default)]
pub struct ChunkAccumulator {
    id: String,
    model: String,
    created: u64,
    choices: BTreeMap<u32, ChoiceState>,
    usage: Option<Usage>,
    extension: ExtensionData,
}

impl ChunkAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &StreamChunk) {
        if self.id.is_empty() && !chunk.id.is_empty() {
            self.id = chunk.id.clone();
        }
        if self.model.is_empty() && !chunk.model.is_empty() {
            self.model = chunk.model.clone();
        }
        if self.created == 0 {
            self.created = chunk.created;
        }
        if chunk.usage.is_some() {
            self.usage = chunk.usage.clone();
        }
        for (key, value) in chunk.extension.iter() {
            self.extension.insert(key.clone(), value.clone());
        }

        for choice in &chunk.choices {
            let state = self.choices.entry(choice.index).or_default();
            let delta = &choice.delta;
            if delta.role.is_some() {
                state.role = delta.role;
            }
            if let Some(text) = &delta.content {
                state.content.push_str(text);
                state.saw_content = true;
            }
            for tc in &delta.tool_calls {
                state.tool_calls.push(tc);
            }
            if choice.finish_reason.is_some() {
                state.finish_reason = choice.finish_reason.clone();
            }
        }
    }

    pub fn finish(self) -> ChatResponse {
        let choices = self
            .choices
            .into_iter()
            .map(|(index, state)| {
                let content = state.saw_content.then(|| Content::Text(state.content));
                let mut message = Message::new(state.role.unwrap_or(Role::Assistant), content);
                message.tool_calls = state.tool_calls.finalize();
                Choice {
                    index,
                    message,
                    finish_reason: state.finish_reason,
                    extension: ExtensionData::new(),
                }
            })
            .collect();

        ChatResponse {
            id: self.id,
            model: self.model,
            created: self.created,
            choices,
            usage: self.usage,
            extension: self.extension,
        }
    }
}
