use super::ChatState;
use super::handler::CommandHandler;
use crate::core::error::DocChatError;
use crate::service::DatasetItem;
use crate::utils::text::{preview, strip_think_blocks};
use async_trait::async_trait;
use console::style;

const USAGE: &str = "Usage: /dataset add <n> [info...] | list | update <id> <content...> | delete <id>";

/// Keeps selected chat messages in the service's feedback dataset
pub struct DatasetCommand;

impl DatasetCommand {
    async fn add(state: &mut ChatState, args: &[&str]) -> Result<Option<String>, DocChatError> {
        let [position, info @ ..] = args else {
            return Ok(Some(USAGE.to_string()));
        };

        let message = state.message_at(position)?;
        if message.is_error {
            return Ok(Some(format!(
                "Message {} is an error notice and was not added.",
                position
            )));
        }
        let item = DatasetItem::new(strip_think_blocks(&message.text).trim(), info.join(" "));

        state.dataset.add_item(&item).await?;
        Ok(Some(format!("Message {} added to the dataset.", position)))
    }

    async fn list(state: &mut ChatState) -> Result<Option<String>, DocChatError> {
        let items = state.dataset.items().await?;
        if items.is_empty() {
            return Ok(Some("The dataset is empty.".to_string()));
        }

        let mut lines = Vec::new();
        for item in &items {
            lines.push(format!(
                "{} {}",
                style(format!("[{}]", item.id.as_deref().unwrap_or("?"))).dim(),
                preview(&item.content, 120)
            ));
            if !item.additional_info.is_empty() {
                lines.push(format!("    {}", style(&item.additional_info).dim().magenta()));
            }
        }
        Ok(Some(lines.join("\n")))
    }

    async fn update(state: &mut ChatState, args: &[&str]) -> Result<Option<String>, DocChatError> {
        let [id, content @ ..] = args else {
            return Ok(Some(USAGE.to_string()));
        };
        if content.is_empty() {
            return Ok(Some(USAGE.to_string()));
        }

        let items = state.dataset.items().await?;
        let mut item = items
            .into_iter()
            .find(|item| item.id.as_deref() == Some(*id))
            .ok_or_else(|| DocChatError::Input(format!("No dataset item with id {}", id)))?;
        item.content = content.join(" ");

        state.dataset.update_item(id, &item).await?;
        Ok(Some(format!("Dataset item {} updated.", id)))
    }

    async fn delete(state: &mut ChatState, args: &[&str]) -> Result<Option<String>, DocChatError> {
        let Some(id) = args.first() else {
            return Ok(Some(USAGE.to_string()));
        };

        state.dataset.delete_item(id).await?;
        Ok(Some(format!("Dataset item {} deleted.", id)))
    }
}

#[async_trait]
impl CommandHandler for DatasetCommand {
    async fn execute(
        &self,
        state: &mut ChatState,
        args: &[&str],
    ) -> Result<Option<String>, DocChatError> {
        match args.split_first() {
            Some((&"add", rest)) => Self::add(state, rest).await,
            Some((&"list", _)) => Self::list(state).await,
            Some((&"update", rest)) => Self::update(state, rest).await,
            Some((&"delete", rest)) => Self::delete(state, rest).await,
            _ => Ok(Some(USAGE.to_string())),
        }
    }

    fn help(&self) -> &'static str {
        "/dataset add <n> [info] | list | update <id> <text> | delete <id> - Manage the feedback dataset"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{FakeStore, chat_state};
    use crate::service::testing::FakeAiService;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_add_list_update_delete() {
        let store = Arc::new(FakeStore::default());
        let mut state = chat_state(
            vec![FakeAiService::answer(
                "<think>recall</think>Dystonia is a movement disorder.",
            )],
            store.clone(),
        );
        state.session.compose_draft("What is dystonia?");
        state.session.send().await.unwrap();

        DatasetCommand
            .execute(&mut state, &["add", "2", "good", "answer"])
            .await
            .unwrap();
        {
            let items = store.items.lock().unwrap();
            assert_eq!(items.len(), 1);
            assert_eq!(items[0].content, "Dystonia is a movement disorder.");
            assert_eq!(items[0].additional_info, "good answer");
        }

        let listing = DatasetCommand
            .execute(&mut state, &["list"])
            .await
            .unwrap()
            .unwrap();
        assert!(listing.contains("Dystonia is a movement disorder."));

        DatasetCommand
            .execute(&mut state, &["update", "1", "Dystonia", "causes", "spasms."])
            .await
            .unwrap();
        {
            let items = store.items.lock().unwrap();
            assert_eq!(items[0].content, "Dystonia causes spasms.");
            assert_eq!(items[0].additional_info, "good answer");
        }

        DatasetCommand
            .execute(&mut state, &["delete", "1"])
            .await
            .unwrap();
        assert!(store.items.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_error_replies_are_not_added() {
        let store = Arc::new(FakeStore::default());
        let mut state = chat_state(
            vec![crate::service::testing::Script::Answer(Err(
                DocChatError::Network("Connection failed".to_string()),
            ))],
            store.clone(),
        );
        state.session.compose_draft("hello");
        state.session.send().await.unwrap();

        DatasetCommand
            .execute(&mut state, &["add", "2"])
            .await
            .unwrap();
        assert!(store.items.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_of_unknown_item_fails() {
        let mut state = chat_state(vec![], Arc::new(FakeStore::default()));

        let result = DatasetCommand
            .execute(&mut state, &["update", "9", "text"])
            .await;
        assert!(matches!(result, Err(DocChatError::Input(_))));
    }
}
