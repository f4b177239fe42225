use super::ChatState;
use super::dataset::DatasetCommand;
use super::documents::{
    CategoriesCommand, DocsCommand, RemoveCommand, UnuseCommand, UploadCommand, UseCommand,
    ViewCommand,
};
use crate::chat::RequestMode;
use crate::core::error::DocChatError;
use crate::display;
use async_trait::async_trait;
use console::style;

#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn execute(
        &self,
        state: &mut ChatState,
        args: &[&str],
    ) -> Result<Option<String>, DocChatError>;

    fn help(&self) -> &'static str;
}

pub struct QuitCommand;
pub struct HelpCommand;
pub struct NewChatCommand;
pub struct HistoryCommand;
pub struct ModeCommand;
pub struct CategoryCommand;
pub struct EditCommand;
pub struct RetryCommand;

#[async_trait]
impl CommandHandler for QuitCommand {
    async fn execute(
        &self,
        state: &mut ChatState,
        _args: &[&str],
    ) -> Result<Option<String>, DocChatError> {
        state.should_continue = false;
        Ok(None)
    }

    fn help(&self) -> &'static str {
        "/quit - Exit the chat session"
    }
}

#[async_trait]
impl CommandHandler for HelpCommand {
    async fn execute(
        &self,
        _state: &mut ChatState,
        _args: &[&str],
    ) -> Result<Option<String>, DocChatError> {
        let title = style("Available Commands").bold().underlined();
        let help_text = [
            title.to_string(),
            HelpCommand.help().to_string(),
            QuitCommand.help().to_string(),
            NewChatCommand.help().to_string(),
            HistoryCommand.help().to_string(),
            ModeCommand.help().to_string(),
            CategoryCommand.help().to_string(),
            CategoriesCommand.help().to_string(),
            DocsCommand.help().to_string(),
            UseCommand.help().to_string(),
            UnuseCommand.help().to_string(),
            ViewCommand.help().to_string(),
            UploadCommand.help().to_string(),
            RemoveCommand.help().to_string(),
            EditCommand.help().to_string(),
            RetryCommand.help().to_string(),
            DatasetCommand.help().to_string(),
        ]
        .join("\n");

        Ok(Some(help_text))
    }

    fn help(&self) -> &'static str {
        "/help - Show available commands"
    }
}

#[async_trait]
impl CommandHandler for NewChatCommand {
    async fn execute(
        &self,
        state: &mut ChatState,
        _args: &[&str],
    ) -> Result<Option<String>, DocChatError> {
        state.session.cancel();
        state.session = (state.new_session)();
        Ok(Some("Started a new chat.".to_string()))
    }

    fn help(&self) -> &'static str {
        "/new - Discard this conversation and start a new chat"
    }
}

#[async_trait]
impl CommandHandler for HistoryCommand {
    async fn execute(
        &self,
        state: &mut ChatState,
        _args: &[&str],
    ) -> Result<Option<String>, DocChatError> {
        display::display_history(state.session.messages());
        Ok(None)
    }

    fn help(&self) -> &'static str {
        "/history - Show the conversation with message numbers"
    }
}

#[async_trait]
impl CommandHandler for ModeCommand {
    async fn execute(
        &self,
        state: &mut ChatState,
        args: &[&str],
    ) -> Result<Option<String>, DocChatError> {
        let Some(requested) = args.first() else {
            return Ok(Some(format!("Current mode: {}", state.session.mode())));
        };

        let mode = RequestMode::from_str(requested).ok_or_else(|| {
            DocChatError::Input(format!("Unknown mode `{}`; use sync or stream", requested))
        })?;
        state.session.select_mode(mode);
        Ok(Some(format!("Mode changed to: {}", mode)))
    }

    fn help(&self) -> &'static str {
        "/mode [sync|stream] - Show or change how answers are requested"
    }
}

#[async_trait]
impl CommandHandler for CategoryCommand {
    async fn execute(
        &self,
        state: &mut ChatState,
        args: &[&str],
    ) -> Result<Option<String>, DocChatError> {
        if args.is_empty() {
            return Ok(Some(format!(
                "Current category: {}",
                state.session.category()
            )));
        }

        let category = args.join(" ");
        state.session.select_category(category.clone());
        Ok(Some(format!("Category changed to: {}", category)))
    }

    fn help(&self) -> &'static str {
        "/category [name] - Show or change the category prompts are scoped to"
    }
}

#[async_trait]
impl CommandHandler for EditCommand {
    async fn execute(
        &self,
        state: &mut ChatState,
        args: &[&str],
    ) -> Result<Option<String>, DocChatError> {
        let [position, words @ ..] = args else {
            return Ok(Some("Usage: /edit <n> <new text>".to_string()));
        };
        let id = state.message_at(position)?.id;

        match state.session.edit_message(id, &words.join(" ")) {
            Ok(()) => Ok(Some(format!("Message {} updated.", position))),
            Err(DocChatError::EditRejected(reason)) => Ok(Some(format!(
                "Cannot edit message {}: {}. Use /retry {} to ask again.",
                position, reason, position
            ))),
            Err(e) => Err(e),
        }
    }

    fn help(&self) -> &'static str {
        "/edit <n> <text> - Reword one of your unanswered messages"
    }
}

#[async_trait]
impl CommandHandler for RetryCommand {
    async fn execute(
        &self,
        state: &mut ChatState,
        args: &[&str],
    ) -> Result<Option<String>, DocChatError> {
        let Some(position) = args.first() else {
            return Ok(Some("Usage: /retry <n>".to_string()));
        };

        let message = state.message_at(position)?;
        if !message.is_user() {
            return Ok(Some(format!(
                "Message {} is an answer; pick one of your own messages.",
                position
            )));
        }
        let text = message.text.clone();
        let document = message.document_ref.clone();

        state.session.compose_draft(text);
        state.session.select_document(document);
        state.session.send().await?;
        Ok(None)
    }

    fn help(&self) -> &'static str {
        "/retry <n> - Send one of your earlier messages again"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{FakeStore, chat_state};
    use crate::service::testing::{FakeAiService, Script};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_mode_command_switches_mode() {
        let mut state = chat_state(vec![], Arc::new(FakeStore::default()));

        let output = ModeCommand.execute(&mut state, &["stream"]).await.unwrap();
        assert_eq!(output.as_deref(), Some("Mode changed to: stream"));
        assert_eq!(state.session.mode(), RequestMode::Stream);

        assert!(ModeCommand.execute(&mut state, &["batch"]).await.is_err());
        assert_eq!(state.session.mode(), RequestMode::Stream);
    }

    #[tokio::test]
    async fn test_category_command_accepts_multi_word_names() {
        let mut state = chat_state(vec![], Arc::new(FakeStore::default()));

        CategoryCommand
            .execute(&mut state, &["Movement", "Disorders"])
            .await
            .unwrap();
        assert_eq!(state.session.category(), "Movement Disorders");
    }

    #[tokio::test]
    async fn test_retry_resends_earlier_prompt() {
        let mut state = chat_state(
            vec![
                Script::Answer(Err(DocChatError::Network("Connection failed".to_string()))),
                FakeAiService::answer("second time lucky"),
            ],
            Arc::new(FakeStore::default()),
        );
        state.session.compose_draft("What is dystonia?");
        state.session.send().await.unwrap();

        RetryCommand.execute(&mut state, &["1"]).await.unwrap();

        let messages = state.session.messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[2].text, "What is dystonia?");
        assert_eq!(messages[3].text, "second time lucky");
    }

    #[tokio::test]
    async fn test_edit_of_answered_message_suggests_retry() {
        let mut state = chat_state(
            vec![FakeAiService::answer("ok")],
            Arc::new(FakeStore::default()),
        );
        state.session.compose_draft("first");
        state.session.send().await.unwrap();

        let output = EditCommand
            .execute(&mut state, &["1", "reworded"])
            .await
            .unwrap()
            .unwrap();
        assert!(output.contains("/retry 1"));
        assert_eq!(state.session.messages()[0].text, "first");

        assert!(EditCommand.execute(&mut state, &["7", "x"]).await.is_err());
    }

    #[tokio::test]
    async fn test_new_chat_discards_messages() {
        let mut state = chat_state(
            vec![FakeAiService::answer("ok")],
            Arc::new(FakeStore::default()),
        );
        state.session.compose_draft("hello");
        state.session.send().await.unwrap();
        assert_eq!(state.session.messages().len(), 2);

        NewChatCommand.execute(&mut state, &[]).await.unwrap();
        assert!(state.session.messages().is_empty());
    }
}
