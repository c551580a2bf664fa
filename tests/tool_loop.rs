//! Tool-calling orchestration against a mock provider.

use chatwire::error::BoxError;
use chatwire::tools::{handler_fn, ToolCallOrchestrator, ToolRegistry};
use chatwire::types::{ChatRequest, Message, Role};
use chatwire::{ChatClient, Error};
use mockito::{Matcher, Server, ServerGuard};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const CHAT_PATH: &str = "/chat/completions";

fn client(server: &ServerGuard) -> ChatClient {
    ChatClient::builder()
        .base_url(server.url())
        .api_key("test-key")
        .build()
        .expect("client")
}

fn registry() -> ToolRegistry {
    let mut reg = ToolRegistry::new();
    reg.register(
        "get_weather",
        handler_fn(|args: String| async move {
            match serde_json::from_str::<Value>(&args) {
                Ok(v) => Ok(format!("{}: 21C", v["city"].as_str().unwrap_or("?"))),
                Err(e) => Err(Box::new(e) as BoxError),
            }
        }),
        json!({
            "type": "object",
            "properties": {"city": {"type": "string"}},
            "required": ["city"]
        }),
    )
    .unwrap();
    reg.register(
        "get_time",
        handler_fn(|_| async { Ok::<_, BoxError>("12:00".to_string()) }),
        json!({"type": "object"}),
    )
    .unwrap();
    reg
}

fn tool_call_response(calls: Value) -> String {
    json!({
        "id": "chatcmpl-tools",
        "model": "gpt-4o-mini",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": null, "tool_calls": calls},
            "finish_reason": "tool_calls"
        }]
    })
    .to_string()
}

#[tokio::test]
async fn test_two_tool_calls_then_final_answer() {
    let mut server = Server::new_async().await;
    let first = server
        .mock("POST", CHAT_PATH)
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#""tools":\[\{"type":"function","function":\{"name":"get_weather""#.into()),
            Matcher::Regex(r#"\{"type":"function","function":\{"name":"get_time""#.into()),
        ]))
        .with_status(200)
        .with_body(tool_call_response(json!([
            {"id": "call_1", "type": "function", "function": {"name": "get_weather", "arguments": "{\"city\":\"Paris\"}"}},
            {"id": "call_2", "type": "function", "function": {"name": "get_time", "arguments": "{}"}}
        ])))
        .expect(1)
        .create_async()
        .await;
    let second = server
        .mock("POST", CHAT_PATH)
        .match_body(Matcher::Regex(r#""tool_call_id":"call_2""#.into()))
        .with_status(200)
        .with_body(
            json!({"choices": [{"message": {"role": "assistant", "content": "It is 21C in Paris at noon."}, "finish_reason": "stop"}]})
                .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let orchestrator = ToolCallOrchestrator::new(client(&server), registry());
    let mut request = ChatRequest::new("gpt-4o-mini", vec![Message::user("Weather and time?")]);
    let resp = orchestrator.complete_with_tools(&mut request).await.unwrap();

    first.assert_async().await;
    second.assert_async().await;
    assert_eq!(resp.content().as_deref(), Some("It is 21C in Paris at noon."));

    let roles: Vec<Role> = request.messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant, Role::Tool, Role::Tool]);
    assert_eq!(request.messages[1].tool_calls.len(), 2);
    assert_eq!(request.messages[2].tool_call_id.as_deref(), Some("call_1"));
    assert_eq!(request.messages[2].text().as_deref(), Some("Paris: 21C"));
    assert_eq!(request.messages[3].tool_call_id.as_deref(), Some("call_2"));
    assert_eq!(request.messages[3].text().as_deref(), Some("12:00"));
}

#[tokio::test]
async fn test_bounded_rounds_after_max_requests() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", CHAT_PATH)
        .with_status(200)
        .with_body(tool_call_response(json!([
            {"id": "call_x", "type": "function", "function": {"name": "get_time", "arguments": "{}"}}
        ])))
        .expect(3)
        .create_async()
        .await;

    let orchestrator = ToolCallOrchestrator::new(client(&server), registry()).max_rounds(3);
    let mut request = ChatRequest::new("gpt-4o-mini", vec![Message::user("loop")]);
    let err = orchestrator.complete_with_tools(&mut request).await.unwrap_err();

    mock.assert_async().await;
    assert!(matches!(err, Error::BoundedRounds { max_rounds: 3 }));
    // user + 3 x (assistant + tool)
    assert_eq!(request.messages.len(), 7);
}

#[tokio::test]
async fn test_unknown_tool_aborts_loop() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", CHAT_PATH)
        .with_status(200)
        .with_body(tool_call_response(json!([
            {"id": "call_9", "type": "function", "function": {"name": "launch_rocket", "arguments": "{}"}}
        ])))
        .expect(1)
        .create_async()
        .await;

    let orchestrator = ToolCallOrchestrator::new(client(&server), registry());
    let mut request = ChatRequest::new("gpt-4o-mini", vec![Message::user("go")]);
    let err = orchestrator.complete_with_tools(&mut request).await.unwrap_err();

    mock.assert_async().await;
    match err {
        Error::ToolExecution { tool, call_id, .. } => {
            assert_eq!(tool, "launch_rocket");
            assert_eq!(call_id.as_deref(), Some("call_9"));
        }
        other => panic!("expected tool error, got {:?}", other),
    }
    assert_eq!(request.messages.len(), 1);
}

#[tokio::test]
async fn test_answer_without_tools_returns_immediately() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", CHAT_PATH)
        .with_status(200)
        .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"no tools needed"}}]}"#)
        .expect(1)
        .create_async()
        .await;

    let orchestrator = ToolCallOrchestrator::new(client(&server), registry());
    let mut request = ChatRequest::new("gpt-4o-mini", vec![Message::user("hi")]);
    let resp = orchestrator.complete_with_tools(&mut request).await.unwrap();

    mock.assert_async().await;
    assert_eq!(resp.content().as_deref(), Some("no tools needed"));
    assert_eq!(request.tools.len(), 2);
    assert_eq!(request.messages.len(), 1);
}

#[tokio::test]
async fn test_results_follow_call_order_not_completion_order() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let finished: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

    let mut reg = ToolRegistry::new();
    for (name, delay_ms) in [("slow_lookup", 50u64), ("fast_lookup", 0u64)] {
        let (in_flight, peak, finished) = (in_flight.clone(), peak.clone(), finished.clone());
        reg.register(
            name,
            handler_fn(move |_args: String| {
                let (in_flight, peak, finished) = (in_flight.clone(), peak.clone(), finished.clone());
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    if delay_ms > 0 {
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    }
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    finished.lock().unwrap().push(name);
                    Ok::<_, BoxError>(format!("{} result", name))
                }
            }),
            json!({"type": "object"}),
        )
        .unwrap();
    }

    let mut server = Server::new_async().await;
    let first = server
        .mock("POST", CHAT_PATH)
        .match_body(Matcher::Regex(
            r#""messages":\[\{"role":"user","content":"both please"\}\]"#.into(),
        ))
        .with_status(200)
        .with_body(tool_call_response(json!([
            {
                "id": "call_1", "type": "function",
                "function": {"name": "slow_lookup", "arguments": "{}"},
                "extra_content": {"google": {"thought_signature": "sig-1"}}
            },
            {"id": "call_2", "type": "function", "function": {"name": "fast_lookup", "arguments": "{}"}}
        ])))
        .expect(1)
        .create_async()
        .await;
    let second = server
        .mock("POST", CHAT_PATH)
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#""tool_call_id":"call_2""#.into()),
            Matcher::Regex(r#""thought_signature":"sig-1""#.into()),
        ]))
        .with_status(200)
        .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"done"}}]}"#)
        .expect(1)
        .create_async()
        .await;

    let orchestrator = ToolCallOrchestrator::new(client(&server), reg);
    let mut request = ChatRequest::new("gpt-4o-mini", vec![Message::user("both please")]);
    let resp = orchestrator.complete_with_tools(&mut request).await.unwrap();

    first.assert_async().await;
    second.assert_async().await;
    assert_eq!(resp.content().as_deref(), Some("done"));

    assert_eq!(peak.load(Ordering::SeqCst), 2, "calls of one round should overlap");
    assert_eq!(*finished.lock().unwrap(), vec!["fast_lookup", "slow_lookup"]);

    assert_eq!(request.messages[2].tool_call_id.as_deref(), Some("call_1"));
    assert_eq!(request.messages[2].text().as_deref(), Some("slow_lookup result"));
    assert_eq!(request.messages[3].tool_call_id.as_deref(), Some("call_2"));
    assert_eq!(request.messages[3].text().as_deref(), Some("fast_lookup result"));
    assert_eq!(
        request.messages[1].tool_calls[0].extension.get("extra_content"),
        Some(&json!({"google": {"thought_signature": "sig-1"}}))
    );
}
