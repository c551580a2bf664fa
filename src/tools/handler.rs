//! Tool handlers: the code that runs when the model calls a tool.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::marker::PhantomData;

use crate::error::BoxError;
use crate::types::ToolDefinition;

/// Executes one tool call.
///
/// `arguments` is the raw JSON text the model produced; the returned string
/// becomes the content of the tool message sent back to the model.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn invoke(&self, arguments: &str) -> Result<String, BoxError>;
}

struct FnHandler<F, Fut> {
    f: F,
    _fut: PhantomData<fn() -> Fut>,
}

#[async_trait]
impl<F, Fut> ToolHandler for FnHandler<F, Fut>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, BoxError>> + Send,
{
    async fn invoke(&self, arguments: &str) -> Result<String, BoxError> {
        (self.f)(arguments.to_string()).await
    }
}

/// Wrap an async closure taking the raw argument text.
///
/// ```rust
/// use chatwire::tools::handler_fn;
/// use chatwire::BoxError;
///
/// let echo = handler_fn(|args: String| async move { Ok::<_, BoxError>(args) });
/// # let _ = echo;
/// ```
pub fn handler_fn<F, Fut>(f: F) -> impl ToolHandler + 'static
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<String, BoxError>> + Send + 'static,
{
    FnHandler {
        f,
        _fut: PhantomData,
    }
}

/// A tool with typed input and output.
///
/// The parameter schema is generated from `Input` with `schemars`, and the
/// arguments are deserialized into it before [`Tool::call`] runs. The output is
/// serialized to JSON for the tool message.
#[async_trait]
pub trait Tool: Send + Sync + 'static {
    type Input: DeserializeOwned + JsonSchema + Send;
    type Output: Serialize + Send;

    fn name(&self) -> &str;

    fn description(&self) -> &str;

    async fn call(&self, input: Self::Input) -> Result<Self::Output, BoxError>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::function(self.name(), self.description(), parameters_schema::<Self::Input>())
    }
}

/// JSON schema of `T`, without the `$schema` marker providers reject.
pub fn parameters_schema<T: JsonSchema>() -> serde_json::Value {
    let schema = schemars::schema_for!(T);
    let mut value = serde_json::to_value(&schema).unwrap_or_else(|_| serde_json::json!({}));
    if let Some(obj) = value.as_object_mut() {
        obj.remove("$schema");
    }
    value
}

pub(crate) struct TypedHandler<T>(pub(crate) T);

#[async_trait]
impl<T: Tool> ToolHandler for TypedHandler<T> {
    async fn invoke(&self, arguments: &str) -> Result<String, BoxError> {
        let raw = if arguments.trim().is_empty() { "{}" } else { arguments };
        let input: T::Input = serde_json::from_str(raw)?;
        let output = self.0.call(input).await?;
        Ok(serde_json::to_string(&output)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, JsonSchema)]
    struct AddInput {
        a: i64,
        b: i64,
    }

    #[derive(Serialize)]
    struct AddOutput {
        sum: i64,
    }

    struct Add;

    #[async_trait]
    impl Tool for Add {
        type Input = AddInput;
        type Output = AddOutput;

        fn name(&self) -> &str {
            "add"
        }

        fn description(&self) -> &str {
            "Add two integers"
        }

        async fn call(&self, input: AddInput) -> Result<AddOutput, BoxError> {
            Ok(AddOutput { sum: input.a + input.b })
        }
    }

    #[test]
    fn test_typed_definition_schema() {
        let def = Add.definition();
        assert_eq!(def.name(), "add");
        let params = &def.function.parameters;
        assert_eq!(params["type"], "object");
        assert_eq!(params["properties"]["a"]["type"], "integer");
        assert!(params.get("$schema").is_none());
    }

    #[tokio::test]
    async fn test_typed_handler_round_trip() {
        let handler = TypedHandler(Add);
        let out = handler.invoke(r#"{"a": 2, "b": 3}"#).await.unwrap();
        assert_eq!(out, r#"{"sum":5}"#);
        assert!(handler.invoke("{\"a\": 1}").await.is_err());
    }

    #[tokio::test]
    async fn test_handler_fn() {
        let handler = handler_fn(|args: String| async move { Ok::<_, BoxError>(format!("got {}", args)) });
        assert_eq!(handler.invoke("{}").await.unwrap(), "got {}");
    }
}
