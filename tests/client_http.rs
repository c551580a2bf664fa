//! ChatClient against a mock provider: encoding, auth, and response classification.

use chatwire::codec::FileUpload;
use chatwire::types::{
    ChatRequest, EmbeddingRequest, Message, SpeechRequest, TranscriptionRequest,
};
use chatwire::{ApiErrorCode, ChatClient, Error, ErrorKind};
use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;

const CHAT_PATH: &str = "/chat/completions";

fn client(server: &ServerGuard) -> ChatClient {
    ChatClient::builder()
        .base_url(server.url())
        .api_key("test-key")
        .build()
        .expect("client")
}

fn request() -> ChatRequest {
    ChatRequest::new("gpt-4o-mini", vec![Message::user("Hello")])
}

#[tokio::test]
async fn test_chat_completion_sends_auth_and_extension_fields() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", CHAT_PATH)
        .match_header("authorization", "Bearer test-key")
        .match_header("content-type", "application/json")
        .match_header("x-request-id", Matcher::Regex("^[0-9a-f-]{36}$".into()))
        .match_body(Matcher::PartialJson(json!({
            "model": "gpt-4o-mini",
            "service_tier": "flex",
            "messages": [{"role": "user", "content": "Hello"}]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "chatcmpl-1",
                "model": "gpt-4o-mini",
                "created": 1,
                "system_fingerprint": "fp_1",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "Hi there", "refusal": null},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 5, "completion_tokens": 2, "total_tokens": 7}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let resp = client(&server)
        .chat_completion(&request().extension("service_tier", "flex"))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(resp.content().as_deref(), Some("Hi there"));
    assert_eq!(resp.extension.get("system_fingerprint"), Some(&json!("fp_1")));
    assert!(resp.choices[0].message.extension.contains_key("refusal"));
    assert_eq!(resp.usage.unwrap().total_tokens, 7);
}

#[tokio::test]
async fn test_stream_flag_is_cleared_for_non_streaming_call() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", CHAT_PATH)
        .match_body(Matcher::Json(json!({
            "model": "gpt-4o-mini",
            "messages": [{"role": "user", "content": "Hello"}]
        })))
        .with_status(200)
        .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"ok"}}]}"#)
        .create_async()
        .await;

    let resp = client(&server).chat_completion(&request().stream()).await.unwrap();
    mock.assert_async().await;
    assert_eq!(resp.content().as_deref(), Some("ok"));
}

#[tokio::test]
async fn test_success_status_with_unparsable_body_is_protocol_error() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", CHAT_PATH)
        .with_status(200)
        .with_body("definitely not json")
        .create_async()
        .await;

    let err = client(&server).chat_completion(&request()).await.unwrap_err();
    match err {
        Error::Protocol { status, body, .. } => {
            assert_eq!(status, 200);
            assert_eq!(body, "definitely not json");
        }
        other => panic!("expected protocol error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_error_envelope_is_api_error() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", CHAT_PATH)
        .with_status(429)
        .with_header("retry-after", "2")
        .with_header("x-request-id", "req_abc")
        .with_body(
            json!({"error": {
                "type": "requests",
                "code": "rate_limit_exceeded",
                "message": "Rate limit reached",
                "param": null
            }})
            .to_string(),
        )
        .create_async()
        .await;

    let err = client(&server).chat_completion(&request()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Api);
    let api = err.as_api().unwrap();
    assert_eq!(api.status, 429);
    assert_eq!(api.error_type(), Some("requests"));
    assert_eq!(api.code(), Some("rate_limit_exceeded"));
    assert_eq!(api.message(), "Rate limit reached");
    assert_eq!(api.retry_after_ms, Some(2000));
    assert_eq!(api.request_id.as_deref(), Some("req_abc"));
    assert_eq!(api.standard_code(), ApiErrorCode::RateLimited);
    assert!(api.standard_code().retryable());
}

#[tokio::test]
async fn test_non_envelope_error_is_protocol_error_with_body() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", CHAT_PATH)
        .with_status(502)
        .with_header("content-type", "text/html")
        .with_body("<html>Bad Gateway</html>")
        .create_async()
        .await;

    let err = client(&server).chat_completion(&request()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Protocol);
    assert_eq!(err.status(), Some(502));
    assert_eq!(err.raw_body(), Some("<html>Bad Gateway</html>"));
}

#[tokio::test]
async fn test_connection_failure_is_transport_error() {
    let client = ChatClient::builder()
        .base_url("http://127.0.0.1:1")
        .build()
        .unwrap();
    let err = client.chat_completion(&request()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
}

#[tokio::test]
async fn test_speech_returns_raw_bytes() {
    let audio: Vec<u8> = vec![0x49, 0x44, 0x33, 0x04, 0x00, 0xff, 0xfb];
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/audio/speech")
        .match_body(Matcher::PartialJson(json!({"voice": "alloy", "response_format": "mp3"})))
        .with_status(200)
        .with_header("content-type", "audio/mpeg")
        .with_body(audio.clone())
        .create_async()
        .await;

    let req = SpeechRequest::new("tts-1", "Hello", "alloy").response_format("mp3");
    let bytes = client(&server).speech(&req).await.unwrap();
    assert_eq!(bytes.as_ref(), audio.as_slice());
}

#[tokio::test]
async fn test_speech_error_is_classified() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/audio/speech")
        .with_status(401)
        .with_body(r#"{"error":{"type":"invalid_request_error","code":"invalid_api_key","message":"Incorrect API key"}}"#)
        .create_async()
        .await;

    let req = SpeechRequest::new("tts-1", "Hello", "alloy");
    let err = client(&server).speech(&req).await.unwrap_err();
    let api = err.as_api().unwrap();
    assert_eq!(api.status, 401);
    assert_eq!(api.standard_code(), ApiErrorCode::Authentication);
}

#[tokio::test]
async fn test_transcription_uploads_multipart() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/audio/transcriptions")
        .match_header(
            "content-type",
            Matcher::Regex("^multipart/form-data; boundary=".into()),
        )
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#"name="model"\r\n\r\nwhisper-1"#.into()),
            Matcher::Regex(r#"name="language"\r\n\r\nfr"#.into()),
            Matcher::Regex(r#"name="prompt"\r\n\r\n\r\n"#.into()),
            Matcher::Regex(r#"name="file"; filename="clip.wav""#.into()),
        ]))
        .with_status(200)
        .with_body(r#"{"text":"bonjour","language":"french","duration":1.5}"#)
        .create_async()
        .await;

    let upload = FileUpload::new("clip.wav", b"RIFF....WAVE".to_vec()).with_mime_type("audio/wav");
    let req = TranscriptionRequest::new("whisper-1", upload).language("fr");
    let result = client(&server).transcription(&req).await.unwrap();

    mock.assert_async().await;
    assert_eq!(result.text, "bonjour");
    assert_eq!(result.duration, Some(1.5));
}

#[tokio::test]
async fn test_embeddings() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/embeddings")
        .match_body(Matcher::PartialJson(json!({"input": ["a", "b"]})))
        .with_status(200)
        .with_body(
            json!({
                "object": "list",
                "model": "text-embedding-3-small",
                "data": [
                    {"object": "embedding", "index": 1, "embedding": [0.5, 0.5]},
                    {"object": "embedding", "index": 0, "embedding": [1.0, 0.0]}
                ],
                "usage": {"prompt_tokens": 2, "total_tokens": 2}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let req = EmbeddingRequest::batch("text-embedding-3-small", vec!["a".into(), "b".into()]);
    let resp = client(&server).embeddings(&req).await.unwrap();
    assert_eq!(resp.vectors(), vec![&[1.0f32, 0.0][..], &[0.5f32, 0.5][..]]);
    assert_eq!(resp.extension.get("object"), Some(&json!("list")));
}

#[tokio::test]
async fn test_post_json_to_custom_path() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/moderations")
        .with_status(200)
        .with_body(r#"{"choices":[]}"#)
        .create_async()
        .await;

    let resp: chatwire::ChatResponse = client(&server)
        .post_json("moderations", &request())
        .await
        .unwrap();
    assert!(resp.choices.is_empty());
}
