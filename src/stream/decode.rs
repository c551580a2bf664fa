//! Server-sent events decoder (bytes -> `StreamChunk`).
//!
//! Lines are split with `LinesCodec` over a bounded buffer. Blank lines and
//! `:` comments are skipped, `data:` lines (prefix matched case-insensitively)
//! carry either a JSON chunk or the `[DONE]` sentinel, and every other SSE
//! field (`event:`, `id:`, `retry:`) is ignored.

use bytes::{Bytes, BytesMut};
use futures::{stream, Stream, StreamExt};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio_util::codec::{Decoder, LinesCodec, LinesCodecError};
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

use crate::stream::accumulate::ChunkAccumulator;
use crate::transport::TransportError;
use crate::types::{ChatResponse, StreamChunk};
use crate::{BoxStream, Error, Result};

/// Terminal sentinel payload. Matched case-sensitively.
pub const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, PartialEq, Eq)]
enum Line<'a> {
    Skip,
    Done,
    Data(&'a str),
}

fn classify_line(line: &str) -> Line<'_> {
    if line.is_empty() || line.starts_with(':') {
        return Line::Skip;
    }
    let is_data = line
        .get(..5)
        .map(|p| p.eq_ignore_ascii_case("data:"))
        .unwrap_or(false);
    if !is_data {
        return Line::Skip;
    }
    let rest = &line[5..];
    let payload = rest.strip_prefix(' ').unwrap_or(rest);
    if payload == DONE_SENTINEL {
        Line::Done
    } else if payload.trim().is_empty() {
        // keep-alive
        Line::Skip
    } else {
        Line::Data(payload)
    }
}

struct DecodeState<S> {
    input: S,
    buf: BytesMut,
    codec: LinesCodec,
    cancel: CancellationToken,
    frames: u64,
    eof: bool,
    finished: bool,
    done: Arc<AtomicBool>,
}

impl<S> DecodeState<S> {
    fn fail(mut self, err: Error) -> Option<(Result<StreamChunk>, Self)> {
        self.finished = true;
        Some((Err(err), self))
    }

    fn line_error(&self, err: LinesCodecError) -> Error {
        match err {
            LinesCodecError::MaxLineLengthExceeded => {
                Error::stream(self.frames, "SSE line exceeds the configured maximum length", None)
            }
            LinesCodecError::Io(e) => {
                Error::stream(self.frames, "unreadable SSE line", Some(e.into()))
            }
        }
    }
}

/// Decode an SSE byte stream into chat chunks.
///
/// The stream ends after `[DONE]` or at end of input. A chunk that fails to
/// parse, an over-long line, or a body read failure ends it with one
/// `Error::Stream`.
/// Cancelling `cancel` yields `TransportError::Cancelled` once and ends it.
pub fn decode_sse<S>(input: S, cancel: CancellationToken, max_line_bytes: usize) -> ChunkStream
where
    S: Stream<Item = Result<Bytes>> + Send + 'static,
{
    let done = Arc::new(AtomicBool::new(false));
    let state = DecodeState {
        input: Box::pin(input),
        buf: BytesMut::new(),
        codec: LinesCodec::new_with_max_length(max_line_bytes),
        cancel,
        frames: 0,
        eof: false,
        finished: false,
        done: done.clone(),
    };

    let chunks = stream::unfold(state, |mut st| async move {
        if st.finished {
            return None;
        }
        loop {
            if st.cancel.is_cancelled() {
                return st.fail(Error::Transport(TransportError::Cancelled));
            }

            let next_line = if st.eof {
                st.codec.decode_eof(&mut st.buf)
            } else {
                st.codec.decode(&mut st.buf)
            };

            let line = match next_line {
                Ok(Some(line)) => line,
                Ok(None) if st.eof => {
                    if !st.done.load(Ordering::Acquire) {
                        warn!(frames = st.frames, "stream ended without [DONE]");
                    }
                    return None;
                }
                Ok(None) => {
                    tokio::select! {
                        biased;
                        _ = st.cancel.cancelled() => {
                            return st.fail(Error::Transport(TransportError::Cancelled));
                        }
                        next = st.input.next() => match next {
                            Some(Ok(bytes)) => st.buf.extend_from_slice(&bytes),
                            Some(Err(e)) if e.is_cancelled() => return st.fail(e),
                            Some(Err(e)) => {
                                let err = Error::stream(st.frames, "body read failed", Some(e.into()));
                                return st.fail(err);
                            }
                            None => st.eof = true,
                        }
                    }
                    continue;
                }
                Err(e) => {
                    let err = st.line_error(e);
                    return st.fail(err);
                }
            };

            match classify_line(&line) {
                Line::Skip => continue,
                Line::Done => {
                    st.done.store(true, Ordering::Release);
                    trace!(frames = st.frames, "stream finished");
                    return None;
                }
                Line::Data(payload) => match serde_json::from_str::<StreamChunk>(payload) {
                    Ok(chunk) => {
                        st.frames += 1;
                        return Some((Ok(chunk), st));
                    }
                    Err(e) => {
                        let err = Error::stream(
                            st.frames,
                            format!("malformed chunk: {}", payload),
                            Some(e.into()),
                        );
                        return st.fail(err);
                    }
                },
            }
        }
    });

    ChunkStream {
        inner: Box::pin(chunks),
        done,
    }
}

/// Decoded chunk stream of one streaming exchange.
///
/// Dropping it releases the underlying connection.
pub struct ChunkStream {
    inner: BoxStream<'static, StreamChunk>,
    done: Arc<AtomicBool>,
}

impl ChunkStream {
    /// Whether the terminal `[DONE]` sentinel has been read.
    ///
    /// After the stream is exhausted, `false` means the connection closed early.
    pub fn saw_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    /// Drain the stream and fold it into a single response.
    pub async fn collect_response(mut self) -> Result<ChatResponse> {
        let mut acc = ChunkAccumulator::new();
        while let Some(chunk) = self.next().await {
            acc.push(&chunk?);
        }
        Ok(acc.finish())
    }
}

impl Stream for ChunkStream {
    type Item = Result<StreamChunk>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl std::fmt::Debug for ChunkStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkStream")
            .field("saw_done", &self.saw_done())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn feed<T>(parts: Vec<T>) -> impl Stream<Item = Result<Bytes>> + Send + 'static
    where
        T: Into<Bytes> + Send + 'static,
    {
        stream::iter(parts.into_iter().map(|p| Ok(p.into())))
    }

    fn decode<T>(parts: Vec<T>) -> ChunkStream
    where
        T: Into<Bytes> + Send + 'static,
    {
        decode_sse(feed(parts), CancellationToken::new(), 1024)
    }

    fn chunk(content: &str) -> String {
        format!(
            r#"data: {{"id":"c1","choices":[{{"index":0,"delta":{{"content":"{}"}}}}]}}"#,
            content
        )
    }

    #[test]
    fn test_classify_line() {
        assert_eq!(classify_line(""), Line::Skip);
        assert_eq!(classify_line(": keep-alive"), Line::Skip);
        assert_eq!(classify_line("event: message"), Line::Skip);
        assert_eq!(classify_line("data: [DONE]"), Line::Done);
        assert_eq!(classify_line("data:[DONE]"), Line::Done);
        assert_eq!(classify_line("data: [done]"), Line::Data("[done]"));
        assert_eq!(classify_line("DATA: {}"), Line::Data("{}"));
        assert_eq!(classify_line("Data:{\"a\":1}"), Line::Data("{\"a\":1}"));
        assert_eq!(classify_line("data:"), Line::Skip);
    }

    #[tokio::test]
    async fn test_frames_then_done() {
        let body = format!("{}\n\n{}\n\ndata: [DONE]\n\n{}\n\n", chunk("Hi"), chunk("!"), chunk("late"));
        let mut s = decode(vec![body]);

        let mut text = String::new();
        while let Some(item) = s.next().await {
            text.push_str(item.unwrap().content().unwrap_or(""));
        }
        assert_eq!(text, "Hi!");
        assert!(s.saw_done());
    }

    #[tokio::test]
    async fn test_lines_split_across_reads() {
        let mut s = decode(vec![
            "data: {\"choices\":[{\"delta\":{\"con",
            "tent\":\"ab\"}}]}\r\n",
            "\r\n: ping\r\ndata: [DO",
            "NE]\r\n",
        ]);
        let first = s.next().await.unwrap().unwrap();
        assert_eq!(first.content(), Some("ab"));
        assert!(s.next().await.is_none());
        assert!(s.saw_done());
    }

    #[tokio::test]
    async fn test_malformed_chunk_fails_fast() {
        let mut s = decode(vec!["data: {\"choices\":[]}\n\ndata: {oops\n\ndata: {\"choices\":[]}\n\n"]);
        assert!(s.next().await.unwrap().is_ok());
        match s.next().await.unwrap() {
            Err(Error::Stream { frames, .. }) => assert_eq!(frames, 1),
            other => panic!("expected stream error, got {:?}", other),
        }
        assert!(s.next().await.is_none());
    }

    #[tokio::test]
    async fn test_eof_without_done() {
        let mut s = decode(vec!["data: {\"choices\":[]}\n\ndata: {\"choices\":[]}"]);
        assert!(s.next().await.unwrap().is_ok());
        assert!(s.next().await.unwrap().is_ok());
        assert!(s.next().await.is_none());
        assert!(!s.saw_done());
    }

    #[tokio::test]
    async fn test_over_long_line_is_stream_error() {
        let mut s = decode_sse(
            feed(vec!["data: {\"choices\":[{\"delta\":{\"content\":\"0123456789\"}}]}\n"]),
            CancellationToken::new(),
            16,
        );
        assert!(matches!(s.next().await, Some(Err(Error::Stream { .. }))));
        assert!(s.next().await.is_none());
    }

    #[tokio::test]
    async fn test_read_failure_mid_stream_is_stream_error() {
        let input = stream::iter(vec![
            Ok(Bytes::from_static(b"data: {\"choices\":[]}\n")),
            Err(Error::Transport(TransportError::Other("connection reset".into()))),
            Ok(Bytes::from_static(b"data: {\"choices\":[]}\n")),
        ]);
        let mut s = decode_sse(input, CancellationToken::new(), 1024);
        assert!(s.next().await.unwrap().is_ok());
        let err = s.next().await.unwrap().unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Stream);
        match &err {
            Error::Stream { frames, source, .. } => {
                assert_eq!(*frames, 1);
                let cause = source.as_ref().unwrap().to_string();
                assert!(cause.contains("connection reset"), "{}", cause);
            }
            other => panic!("expected stream error, got {:?}", other),
        }
        assert!(s.next().await.is_none());
        assert!(!s.saw_done());
    }

    #[tokio::test]
    async fn test_cancelled_input_stays_transport() {
        let input = stream::iter(vec![Err(Error::Transport(TransportError::Cancelled))]);
        let mut s = decode_sse(input, CancellationToken::new(), 1024);
        let err = s.next().await.unwrap().unwrap_err();
        assert!(err.is_cancelled());
        assert!(s.next().await.is_none());
    }

    #[tokio::test]
    async fn test_cancellation_yields_once() {
        let token = CancellationToken::new();
        let input = stream::iter(vec![Ok(Bytes::from_static(b"data: {\"choices\":[]}\n"))])
            .chain(stream::pending());
        let mut s = decode_sse(input, token.clone(), 1024);

        assert!(s.next().await.unwrap().is_ok());
        token.cancel();
        let err = s.next().await.unwrap().unwrap_err();
        assert!(err.is_cancelled());
        assert!(s.next().await.is_none());
    }

    #[tokio::test]
    async fn test_collect_response() {
        let s = decode(vec![
            "data: {\"id\":\"x\",\"model\":\"m\",\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\",\"content\":\"Hi\"}}]}\n\n",
            "data: {\"id\":\"x\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"!\"},\"finish_reason\":\"stop\"}]}\n\n",
            "data: [DONE]\n\n",
        ]);
        let resp = s.collect_response().await.unwrap();
        assert_eq!(resp.content().as_deref(), Some("Hi!"));
        assert_eq!(resp.finish_reason(), Some("stop"));
        assert_eq!(resp.model, "m");
    }
}
