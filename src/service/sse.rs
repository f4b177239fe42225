use super::EventStream;
use super::types::StreamEvent;
use crate::core::error::DocChatError;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use std::collections::VecDeque;

/// Incremental decoder for `text/event-stream` bodies.
///
/// Network chunks may split lines (and UTF-8 sequences) anywhere, so bytes are buffered
/// until a full line is available. Only `data:` fields matter to us; `event:`, `id:` and
/// `retry:` lines and `:` comments are skipped.
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one chunk and returns the data payloads of every event it completed.
    ///
    /// A line that is not valid UTF-8 ends decoding: the payloads completed before it are
    /// returned first, followed by the error.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<String, DocChatError>> {
        self.pending.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = match String::from_utf8(raw) {
                Ok(line) => line,
                Err(e) => {
                    self.pending.clear();
                    self.data.clear();
                    payloads.push(Err(DocChatError::Stream(format!(
                        "invalid UTF-8 in event stream: {}",
                        e
                    ))));
                    break;
                }
            };
            if let Some(payload) = self.process_line(line.trim_end_matches(['\n', '\r'])) {
                payloads.push(Ok(payload));
            }
        }
        payloads
    }

    /// Flushes an event left unterminated when the body ended.
    pub fn finish(&mut self) -> Result<Option<String>, DocChatError> {
        if !self.pending.is_empty() {
            let raw = std::mem::take(&mut self.pending);
            let line = String::from_utf8(raw)
                .map_err(|e| DocChatError::Stream(format!("invalid UTF-8 in event stream: {}", e)))?;
            if let Some(payload) = self.process_line(line.trim_end_matches('\r')) {
                return Ok(Some(payload));
            }
        }
        Ok(self.take_event())
    }

    fn process_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.take_event();
        }
        if line.starts_with(':') {
            return None;
        }
        if let Some(value) = line.strip_prefix("data:") {
            let value = value.strip_prefix(' ').unwrap_or(value);
            self.data.push(value.to_string());
        }
        None
    }

    fn take_event(&mut self) -> Option<String> {
        if self.data.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.data).join("\n"))
        }
    }
}

struct DecodeState<B, E> {
    body: BoxStream<'static, Result<B, E>>,
    decoder: SseDecoder,
    ready: VecDeque<Result<StreamEvent, DocChatError>>,
    exhausted: bool,
}

/// Turns a raw byte stream into a stream of [`StreamEvent`]s.
///
/// A transport or decoding error is yielded once and ends the stream.
pub fn event_stream<S, B, E>(body: S) -> EventStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<DocChatError> + Send + 'static,
{
    let state = DecodeState {
        body: body.boxed(),
        decoder: SseDecoder::new(),
        ready: VecDeque::new(),
        exhausted: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.ready.pop_front() {
                return Some((item, state));
            }
            if state.exhausted {
                return None;
            }

            match state.body.next().await {
                Some(Ok(chunk)) => {
                    for payload in state.decoder.push(chunk.as_ref()) {
                        match payload {
                            Ok(data) => state.ready.push_back(StreamEvent::from_data(&data)),
                            Err(e) => {
                                state.ready.push_back(Err(e));
                                state.exhausted = true;
                            }
                        }
                    }
                }
                Some(Err(e)) => {
                    state.ready.push_back(Err(e.into()));
                    state.exhausted = true;
                }
                None => {
                    state.exhausted = true;
                    match state.decoder.finish() {
                        Ok(Some(payload)) => state.ready.push_back(StreamEvent::from_data(&payload)),
                        Ok(None) => {}
                        Err(e) => state.ready.push_back(Err(e)),
                    }
                }
            }
        }
    })
    .boxed()
}
