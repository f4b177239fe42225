use super::log::MessageLog;
use super::message::{Message, MessageId, MessagePatch};
use super::session::SessionObserver;
use super::stream::StreamConnection;
use crate::core::error::DocChatError;
use crate::service::{AiQuery, AiService, Answer, StreamEvent};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// How a turn obtains its reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestMode {
    /// One `/ai_prompt` call, one complete answer
    Sync,
    /// `/ai_prompt_stream`, the answer grows fragment by fragment
    Stream,
}

impl RequestMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sync" | "synchronous" => Some(RequestMode::Sync),
            "stream" | "streaming" => Some(RequestMode::Stream),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestMode::Sync => "sync",
            RequestMode::Stream => "stream",
        }
    }
}

impl fmt::Display for RequestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the dispatcher needs to ask for one reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnRequest {
    pub prompt: String,
    pub category: String,
    pub use_docs: bool,
}

impl TurnRequest {
    fn query(&self) -> AiQuery {
        AiQuery {
            prompt: self.prompt.clone(),
            use_docs: self.use_docs,
            category: self.category.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    Answered,
    Failed,
}

/// Write access to the session log for the duration of one turn.
///
/// Tracks the single assistant message of the turn so streamed text lands in one slot.
pub struct TurnSink<'a> {
    log: &'a mut MessageLog,
    observer: &'a mut dyn SessionObserver,
    category: Option<String>,
    reply: Option<MessageId>,
}

impl<'a> TurnSink<'a> {
    pub fn new(
        log: &'a mut MessageLog,
        observer: &'a mut dyn SessionObserver,
        category: Option<String>,
    ) -> Self {
        Self {
            log,
            observer,
            category,
            reply: None,
        }
    }

    fn append_reply(&mut self, message: Message) {
        let id = self.log.append(message);
        self.reply = Some(id);
        if let Some(message) = self.log.get(id) {
            self.observer.message_appended(message);
        }
    }

    fn update_reply(&mut self, id: MessageId, patch: MessagePatch) -> Result<(), DocChatError> {
        self.log.update_by_id(id, patch)?;
        if let Some(message) = self.log.get(id) {
            self.observer.message_updated(message);
        }
        Ok(())
    }

    fn answer(&mut self, answer: Answer) {
        let message = Message::assistant(answer.text, self.category.clone()).with_source(answer.source);
        self.append_reply(message);
    }

    /// Replaces the streamed text so far, creating the reply on the first fragment.
    fn stream_text(&mut self, text: &str) -> Result<(), DocChatError> {
        match self.reply {
            Some(id) => self.update_reply(id, MessagePatch::text(text)),
            None => {
                self.append_reply(Message::assistant(text, self.category.clone()));
                Ok(())
            }
        }
    }

    fn finish_stream(&mut self) {
        if self.reply.is_none() {
            self.append_reply(Message::assistant(String::new(), self.category.clone()));
        }
    }

    /// Records `error` as the turn's reply, keeping any text already streamed.
    pub fn fail(&mut self, error: &DocChatError) -> Result<(), DocChatError> {
        let notice = format!("Error: {}", error);
        match self.reply {
            Some(id) => {
                let partial = self
                    .log
                    .get(id)
                    .map(|m| m.text.clone())
                    .ok_or(DocChatError::MessageNotFound(id))?;
                let text = if partial.is_empty() {
                    notice
                } else {
                    format!("{}\n\n{}", partial, notice)
                };
                self.update_reply(id, MessagePatch::error(text))
            }
            None => {
                self.append_reply(Message::assistant(notice, self.category.clone()).failed());
                Ok(())
            }
        }
    }
}

/// Obtains the assistant's reply for a turn and folds it into the session log.
///
/// Remote failures never escape: they become an error reply. The only `Err` returned is
/// an internal inconsistency of the log itself.
#[derive(Clone)]
pub struct RequestDispatcher {
    service: Arc<dyn AiService>,
    idle_timeout: Duration,
}

impl RequestDispatcher {
    pub fn new(service: Arc<dyn AiService>, idle_timeout: Duration) -> Self {
        Self {
            service,
            idle_timeout,
        }
    }

    pub async fn dispatch(
        &self,
        mode: RequestMode,
        request: &TurnRequest,
        sink: &mut TurnSink<'_>,
    ) -> Result<TurnOutcome, DocChatError> {
        match mode {
            RequestMode::Sync => self.query(request, sink).await,
            RequestMode::Stream => self.query_stream(request, sink).await,
        }
    }

    async fn query(
        &self,
        request: &TurnRequest,
        sink: &mut TurnSink<'_>,
    ) -> Result<TurnOutcome, DocChatError> {
        match self.service.ask(&request.query()).await {
            Ok(answer) => {
                sink.answer(answer);
                Ok(TurnOutcome::Answered)
            }
            Err(e) => {
                tracing::warn!("prompt failed: {}", e);
                sink.fail(&e)?;
                Ok(TurnOutcome::Failed)
            }
        }
    }

    async fn query_stream(
        &self,
        request: &TurnRequest,
        sink: &mut TurnSink<'_>,
    ) -> Result<TurnOutcome, DocChatError> {
        let query = request.query();
        let opened = tokio::time::timeout(self.idle_timeout, self.service.ask_stream(&query))
            .await
            .unwrap_or_else(|_| {
                Err(DocChatError::Timeout(format!(
                    "reply stream did not open within {}s",
                    self.idle_timeout.as_secs_f32()
                )))
            });
        let events = match opened {
            Ok(events) => events,
            Err(e) => {
                tracing::warn!("could not open reply stream: {}", e);
                sink.fail(&e)?;
                return Ok(TurnOutcome::Failed);
            }
        };

        let mut connection = StreamConnection::new(events, self.idle_timeout);
        let mut buffer = String::new();

        let outcome = loop {
            match connection.next_event().await {
                Ok(Some(StreamEvent::Fragment(text))) => {
                    buffer.push_str(&text);
                    sink.stream_text(&buffer)?;
                }
                Ok(Some(StreamEvent::Done)) => {
                    connection.close();
                    sink.finish_stream();
                    break TurnOutcome::Answered;
                }
                Ok(None) => {
                    connection.close();
                    let error = DocChatError::Stream(
                        "connection closed before the reply completed".to_string(),
                    );
                    tracing::warn!("{}", error);
                    sink.fail(&error)?;
                    break TurnOutcome::Failed;
                }
                Err(e) => {
                    connection.close();
                    tracing::warn!("reply stream failed: {}", e);
                    sink.fail(&e)?;
                    break TurnOutcome::Failed;
                }
            }
        };

        Ok(outcome)
    }
}
