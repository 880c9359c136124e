//! Server-sent-event decoding for OpenAI-style streamed completions.
//!
//! The body is a sequence of `data: <json>` lines terminated by
//! `data: [DONE]`. Each JSON event carries `choices[0].delta.content`;
//! events without a content field (role announcements, finish markers) are
//! skipped, while an explicit empty string is yielded as an empty chunk.
//! Lines are split on raw bytes so a multi-byte character cut by a network
//! chunk boundary is reassembled before decoding.

use std::collections::VecDeque;

use futures_util::{StreamExt, stream};
use serde_json::Value;

use super::traits::{ByteStream, ChunkStream};
use crate::{AssayError, Result};

/// One decoded SSE data line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    Data(String),
    Done,
}

/// Incremental line decoder.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a body chunk, returning every event completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(event) = parse_line(&line) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a trailing line that had no newline.
    pub fn finish(&mut self) -> Option<SseEvent> {
        let line = std::mem::take(&mut self.buffer);
        parse_line(&line)
    }
}

fn parse_line(line: &[u8]) -> Option<SseEvent> {
    let line = String::from_utf8_lossy(line);
    let data = line
        .trim_end_matches(['\r', '\n'])
        .strip_prefix("data:")?
        .trim_start();
    match data {
        "" => None,
        "[DONE]" => Some(SseEvent::Done),
        data => Some(SseEvent::Data(data.to_string())),
    }
}

/// Extract the text delta from one event payload.
///
/// `None` for events that carry no text.
pub fn delta_content(data: &str) -> Option<Result<String>> {
    let value: Value = match serde_json::from_str(data) {
        Ok(value) => value,
        Err(e) => {
            return Some(Err(AssayError::Model(format!(
                "malformed stream event: {e}"
            ))));
        }
    };
    if let Some(message) = value.pointer("/error/message").and_then(Value::as_str) {
        return Some(Err(AssayError::Model(message.to_string())));
    }
    value
        .pointer("/choices/0/delta/content")
        .and_then(Value::as_str)
        .map(|content| Ok(content.to_string()))
}

struct DecodeState {
    body: ByteStream,
    decoder: SseDecoder,
    pending: VecDeque<Result<String>>,
    finished: bool,
}

impl DecodeState {
    fn accept(&mut self, event: SseEvent) {
        match event {
            SseEvent::Done => self.finished = true,
            SseEvent::Data(data) => {
                if let Some(item) = delta_content(&data) {
                    self.pending.push_back(item);
                }
            }
        }
    }
}

/// Turn an SSE body into a stream of text deltas, in order.
///
/// The stream ends at `[DONE]` or at end of body; a body error is yielded
/// once and ends the stream.
pub fn content_stream(body: ByteStream) -> ChunkStream {
    let state = DecodeState {
        body,
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }
            match state.body.next().await {
                Some(Ok(bytes)) => {
                    for event in state.decoder.push(&bytes) {
                        state.accept(event);
                        if state.finished {
                            break;
                        }
                    }
                }
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((Err(e), state));
                }
                None => {
                    if let Some(event) = state.decoder.finish() {
                        state.accept(event);
                    }
                    state.finished = true;
                }
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(chunks: &[&[u8]]) -> ByteStream {
        let chunks: Vec<Result<Vec<u8>>> = chunks.iter().map(|c| Ok(c.to_vec())).collect();
        Box::pin(stream::iter(chunks))
    }

    async fn collect(stream: ChunkStream) -> Vec<String> {
        stream
            .map(|item| item.unwrap())
            .collect::<Vec<_>>()
            .await
    }

    #[test]
    fn decoder_splits_lines() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"a\"").is_empty());
        assert_eq!(
            decoder.push(b":1}\n\ndata: [DONE]\n"),
            vec![SseEvent::Data("{\"a\":1}".into()), SseEvent::Done]
        );
    }

    #[test]
    fn comments_and_blank_lines_are_ignored() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b": keep-alive\n\nevent: ping\n").is_empty());
    }

    #[test]
    fn role_only_delta_has_no_content() {
        assert!(delta_content(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#).is_none());
        assert!(delta_content(r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#).is_none());
    }

    #[test]
    fn explicit_empty_content_is_a_chunk() {
        let content = delta_content(r#"{"choices":[{"delta":{"content":""}}]}"#);
        assert_eq!(content.unwrap().unwrap(), "");
    }

    #[tokio::test]
    async fn stream_yields_deltas_in_order() {
        let stream = content_stream(body(&[
            b"data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\ndata: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
            b"data: [DONE]\n\n",
            b"data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n\n",
        ]));
        assert_eq!(collect(stream).await, vec!["Hel", "lo"]);
    }

    #[tokio::test]
    async fn multibyte_character_split_across_chunks() {
        let line = "data: {\"choices\":[{\"delta\":{\"content\":\"héllo\"}}]}\n\n".as_bytes();
        let split = line.iter().position(|b| *b == 0xC3).unwrap() + 1;
        let stream = content_stream(body(&[&line[..split], &line[split..]]));
        assert_eq!(collect(stream).await, vec!["héllo"]);
    }

    #[tokio::test]
    async fn trailing_line_without_newline_is_flushed() {
        let stream = content_stream(body(&[b"data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}"]));
        assert_eq!(collect(stream).await, vec!["x"]);
    }

    #[tokio::test]
    async fn error_event_surfaces_as_model_error() {
        let mut stream = content_stream(body(&[b"data: {\"error\":{\"message\":\"overloaded\"}}\n"]));
        let err = stream.next().await.unwrap().unwrap_err();
        assert!(matches!(err, AssayError::Model(msg) if msg == "overloaded"));
    }
}
