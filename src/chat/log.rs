use super::message::{Message, MessageId, MessagePatch, Sender};
use crate::core::error::DocChatError;

/// Append-only, ordered log of the messages of one session.
///
/// The log never talks to the network; the dispatcher folds replies into it and the
/// presentation reads snapshots through [`MessageLog::all`].
#[derive(Debug, Default)]
pub struct MessageLog {
    messages: Vec<Message>,
    next_id: u64,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `message` at the end of the log and returns the id it was given.
    pub fn append(&mut self, mut message: Message) -> MessageId {
        self.next_id += 1;
        let id = MessageId(self.next_id);
        message.id = id;
        self.messages.push(message);
        id
    }

    pub fn update_by_id(&mut self, id: MessageId, patch: MessagePatch) -> Result<(), DocChatError> {
        let message = self
            .messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(DocChatError::MessageNotFound(id))?;
        patch.apply(message);
        Ok(())
    }

    pub fn all(&self) -> &[Message] {
        &self.messages
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// The assistant message answering the user message `id`, if one was recorded.
    pub fn reply_to(&self, id: MessageId) -> Option<&Message> {
        let position = self.messages.iter().position(|m| m.id == id)?;
        self.messages
            .get(position + 1)
            .filter(|m| m.sender == Sender::Assistant)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_assigns_increasing_ids() {
        let mut log = MessageLog::new();
        let first = log.append(Message::user("hi", None, None));
        let second = log.append(Message::assistant("hello", None));

        assert!(first < second);
        let ids: Vec<MessageId> = log.all().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![first, second]);
    }

    #[test]
    fn test_update_by_id_changes_in_place() {
        let mut log = MessageLog::new();
        log.append(Message::user("hi", None, None));
        let reply = log.append(Message::assistant("Sum", None));

        log.update_by_id(reply, MessagePatch::text("Summary")).unwrap();

        assert_eq!(log.len(), 2);
        assert_eq!(log.get(reply).unwrap().text, "Summary");
    }

    #[test]
    fn test_update_unknown_id_is_not_found() {
        let mut log = MessageLog::new();
        log.append(Message::user("hi", None, None));

        let result = log.update_by_id(MessageId(42), MessagePatch::text("x"));
        assert!(matches!(result, Err(DocChatError::MessageNotFound(MessageId(42)))));
        assert_eq!(log.all()[0].text, "hi");
    }

    #[test]
    fn test_reply_to_only_matches_following_assistant() {
        let mut log = MessageLog::new();
        let question = log.append(Message::user("q1", None, None));
        assert!(log.reply_to(question).is_none());

        let answer = log.append(Message::assistant("a1", None));
        let follow_up = log.append(Message::user("q2", None, None));

        assert_eq!(log.reply_to(question).map(|m| m.id), Some(answer));
        assert!(log.reply_to(answer).is_none());
        assert!(log.reply_to(follow_up).is_none());
    }
}
