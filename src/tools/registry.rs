//! Tool registry: name -> handler, schema, and execution policy.

use futures::FutureExt;
use jsonschema::{Draft, JSONSchema};
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::tools::handler::{Tool, ToolHandler, TypedHandler};
use crate::transport::TransportError;
use crate::types::tool::empty_object_schema;
use crate::types::{ToolCall, ToolDefinition};
use crate::{Error, ErrorContext, Result};

struct RegisteredTool {
    definition: ToolDefinition,
    handler: Arc<dyn ToolHandler>,
    validator: Arc<JSONSchema>,
    timeout: Option<Duration>,
}

/// Registered tools in registration order.
///
/// Registering an existing name replaces its handler and schema in place.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    default_timeout: Option<Duration>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timeout applied to tools without their own.
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    /// Register `handler` under `name` with a JSON schema for its arguments.
    pub fn register<H>(&mut self, name: impl Into<String>, handler: H, parameters: Value) -> Result<()>
    where
        H: ToolHandler + 'static,
    {
        let definition = ToolDefinition::function(name, "", parameters);
        self.register_definition(definition, handler)
    }

    /// Register `handler` with a full definition (description, strict mode).
    pub fn register_definition<H>(&mut self, mut definition: ToolDefinition, handler: H) -> Result<()>
    where
        H: ToolHandler + 'static,
    {
        if definition.function.description.as_deref() == Some("") {
            definition.function.description = None;
        }
        self.insert(definition, Arc::new(handler))
    }

    /// Register a typed tool; its schema is derived from `T::Input`.
    pub fn register_tool<T: Tool>(&mut self, tool: T) -> Result<()> {
        let definition = tool.definition();
        self.insert(definition, Arc::new(TypedHandler(tool)))
    }

    fn insert(&mut self, mut definition: ToolDefinition, handler: Arc<dyn ToolHandler>) -> Result<()> {
        if definition.function.parameters.is_null() {
            definition.function.parameters = empty_object_schema();
        }
        let name = definition.name().to_string();
        if name.is_empty() {
            return Err(Error::validation_with_context(
                "tool name must not be empty",
                ErrorContext::new().with_source("tool_registry"),
            ));
        }
        let validator = compile_schema(&name, &definition.function.parameters)?;
        let entry = RegisteredTool {
            definition,
            handler,
            validator,
            timeout: None,
        };

        info!(target: "tool_registry", tool = %name, "registering tool");
        match self.position(&name) {
            Some(i) => self.tools[i] = entry,
            None => self.tools.push(entry),
        }
        Ok(())
    }

    /// Per-tool timeout, overriding the registry default.
    pub fn set_timeout(&mut self, name: &str, timeout: Duration) -> Result<()> {
        match self.position(name) {
            Some(i) => {
                self.tools[i].timeout = Some(timeout);
                Ok(())
            }
            None => Err(Error::validation_with_context(
                "no tool registered under this name",
                ErrorContext::new()
                    .with_field_path(name.to_string())
                    .with_source("tool_registry"),
            )),
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.tools.iter().position(|t| t.definition.name() == name)
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.position(name).map(|i| self.tools[i].handler.clone())
    }

    /// Tool definitions for the request's `tools` field, in registration order.
    pub fn schemas(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition.clone()).collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|t| t.definition.name())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Run one tool call and return the text for its tool message.
    ///
    /// Unknown tools, arguments failing the schema, handler errors, panics and
    /// timeouts all surface as `Error::ToolExecution`.
    pub async fn execute(&self, call: &ToolCall, cancel: &CancellationToken) -> Result<String> {
        let name = call.name();
        let call_id = Some(call.id.clone());
        let tool = match self.position(name) {
            Some(i) => &self.tools[i],
            None => {
                warn!(target: "tool_registry", tool = %name, "model called an unknown tool");
                return Err(Error::tool(name, call_id, format!("unknown tool '{}'", name)));
            }
        };

        validate_arguments(&tool.validator, call.arguments())
            .map_err(|msg| Error::tool(name, call_id.clone(), msg))?;

        debug!(target: "tool_registry", tool = %name, call_id = %call.id, "invoking tool");

        let invocation = AssertUnwindSafe(tool.handler.invoke(call.arguments())).catch_unwind();
        let timeout = tool.timeout.or(self.default_timeout);
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Transport(TransportError::Cancelled)),
            outcome = async {
                match timeout {
                    Some(limit) => tokio::time::timeout(limit, invocation).await.ok(),
                    None => Some(invocation.await),
                }
            } => outcome,
        };

        match outcome {
            Some(Ok(Ok(output))) => Ok(output),
            Some(Ok(Err(e))) => {
                warn!(target: "tool_registry", tool = %name, error = %e, "tool failed");
                Err(Error::tool(name, call_id, e))
            }
            Some(Err(panic)) => {
                let msg = panic_message(panic.as_ref());
                warn!(target: "tool_registry", tool = %name, panic = %msg, "tool panicked");
                Err(Error::tool(name, call_id, format!("handler panicked: {}", msg)))
            }
            None => {
                warn!(target: "tool_registry", tool = %name, "tool timed out");
                Err(Error::tool(name, call_id, "tool execution timed out"))
            }
        }
    }
}

fn compile_schema(name: &str, parameters: &Value) -> Result<Arc<JSONSchema>> {
    let compiled = JSONSchema::options()
        .with_draft(Draft::Draft7)
        .compile(parameters)
        .map_err(|e| {
            Error::validation_with_context(
                format!("invalid parameter schema: {}", e),
                ErrorContext::new()
                    .with_field_path(name.to_string())
                    .with_source("tool_registry"),
            )
        })?;
    Ok(Arc::new(compiled))
}

fn validate_arguments(validator: &JSONSchema, arguments: &str) -> std::result::Result<(), String> {
    let raw = if arguments.trim().is_empty() { "{}" } else { arguments };
    let instance: Value =
        serde_json::from_str(raw).map_err(|e| format!("arguments are not valid JSON: {}", e))?;
    let result = validator.validate(&instance);
    if let Err(errors) = result {
        let messages: Vec<String> = errors
            .map(|e| format!("{} at '{}'", e, e.instance_path))
            .collect();
        return Err(format!("arguments do not match schema: {}", messages.join("; ")));
    }
    Ok(())
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
