use super::dispatcher::{RequestDispatcher, RequestMode, TurnRequest, TurnSink};
use super::log::MessageLog;
use super::message::{DocumentRef, Message, MessageId, MessagePatch};
use crate::config::ChatConfig;
use crate::core::error::DocChatError;

const CANCELLED: &str = "Error: Request cancelled";

/// Receives session changes so a view can render them as they happen.
pub trait SessionObserver: Send {
    fn turn_started(&mut self, _mode: RequestMode) {}

    fn message_appended(&mut self, _message: &Message) {}

    fn message_updated(&mut self, _message: &Message) {}

    fn busy_changed(&mut self, _busy: bool) {}
}

pub struct NoopObserver;

impl SessionObserver for NoopObserver {}

/// One conversation: the message log plus the composer state around it.
///
/// At most one turn is in flight at a time. A turn starts in [`ChatSession::send`] and
/// settles before `send` returns; if the `send` future is dropped midway, the turn stays
/// marked in flight until [`ChatSession::cancel`] is called.
pub struct ChatSession {
    log: MessageLog,
    dispatcher: RequestDispatcher,
    observer: Box<dyn SessionObserver>,
    draft: String,
    category: String,
    document: Option<DocumentRef>,
    mode: RequestMode,
    use_docs: bool,
    in_flight: Option<MessageId>,
}

impl ChatSession {
    pub fn new(dispatcher: RequestDispatcher, settings: &ChatConfig) -> Self {
        Self {
            log: MessageLog::new(),
            dispatcher,
            observer: Box::new(NoopObserver),
            draft: String::new(),
            category: settings.category.clone(),
            document: None,
            mode: settings.mode,
            use_docs: settings.use_docs,
            in_flight: None,
        }
    }

    pub fn with_observer(mut self, observer: Box<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn messages(&self) -> &[Message] {
        self.log.all()
    }

    pub fn message(&self, id: MessageId) -> Option<&Message> {
        self.log.get(id)
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn document(&self) -> Option<&DocumentRef> {
        self.document.as_ref()
    }

    pub fn mode(&self) -> RequestMode {
        self.mode
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn compose_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn select_category(&mut self, category: impl Into<String>) {
        self.category = category.into();
    }

    pub fn select_document(&mut self, document: Option<DocumentRef>) {
        self.document = document;
    }

    pub fn select_mode(&mut self, mode: RequestMode) {
        self.mode = mode;
    }

    /// Sends the current draft and waits until the turn settles.
    ///
    /// Returns the id of the user message. Remote failures are not errors here: they end
    /// up as an error reply in the log.
    pub async fn send(&mut self) -> Result<MessageId, DocChatError> {
        if self.in_flight.is_some() {
            return Err(DocChatError::Busy);
        }
        let prompt = self.draft.trim().to_string();
        if prompt.is_empty() {
            return Err(DocChatError::EmptyDraft);
        }

        let request = TurnRequest {
            prompt: prompt.clone(),
            category: self.category.clone(),
            use_docs: self.use_docs,
        };
        let message = Message::user(prompt, Some(self.category.clone()), self.document.take());
        let user_id = self.log.append(message);
        self.draft.clear();
        if let Some(message) = self.log.get(user_id) {
            self.observer.message_appended(message);
        }
        self.set_in_flight(Some(user_id));
        self.observer.turn_started(self.mode);

        tracing::info!(turn = %user_id, mode = %self.mode, category = %request.category, "sending prompt");

        let mut sink = TurnSink::new(
            &mut self.log,
            self.observer.as_mut(),
            Some(request.category.clone()),
        );
        let result = self.dispatcher.dispatch(self.mode, &request, &mut sink).await;
        self.set_in_flight(None);

        let outcome = result?;
        tracing::debug!(turn = %user_id, ?outcome, "turn settled");
        Ok(user_id)
    }

    /// Replaces the text of a user message that has not been answered.
    ///
    /// Messages that already have a reply, or whose turn is in flight, are left alone:
    /// changing them would leave the reply answering a question nobody asked.
    pub fn edit_message(&mut self, id: MessageId, new_text: &str) -> Result<(), DocChatError> {
        let new_text = new_text.trim();
        if new_text.is_empty() {
            return Err(DocChatError::EmptyDraft);
        }

        let message = self.log.get(id).ok_or(DocChatError::MessageNotFound(id))?;
        if !message.is_user() {
            return Err(DocChatError::EditRejected(
                "only your own messages can be edited".to_string(),
            ));
        }
        if self.in_flight == Some(id) {
            return Err(DocChatError::EditRejected(
                "the message is being answered".to_string(),
            ));
        }
        if self.log.reply_to(id).is_some() {
            return Err(DocChatError::EditRejected(
                "the message already has a reply".to_string(),
            ));
        }

        self.log.update_by_id(id, MessagePatch::text(new_text))?;
        if let Some(message) = self.log.get(id) {
            self.observer.message_updated(message);
        }
        Ok(())
    }

    /// Abandons the in-flight turn, if any. A partially streamed reply is kept and flagged
    /// as an error; a turn without any reply yet is left unanswered.
    pub fn cancel(&mut self) -> bool {
        let Some(user_id) = self.in_flight else {
            return false;
        };

        let partial = self.log.reply_to(user_id).map(|m| (m.id, m.text.clone()));
        if let Some((reply_id, text)) = partial {
            let text = if text.is_empty() {
                CANCELLED.to_string()
            } else {
                format!("{}\n\n{}", text, CANCELLED)
            };
            if self
                .log
                .update_by_id(reply_id, MessagePatch::error(text))
                .is_ok()
            {
                if let Some(message) = self.log.get(reply_id) {
                    self.observer.message_updated(message);
                }
            }
        }

        tracing::info!(turn = %user_id, "turn cancelled");
        self.set_in_flight(None);
        true
    }

    fn set_in_flight(&mut self, turn: Option<MessageId>) {
        let was_busy = self.in_flight.is_some();
        self.in_flight = turn;
        if was_busy != self.in_flight.is_some() {
            self.observer.busy_changed(self.in_flight.is_some());
        }
    }
}
