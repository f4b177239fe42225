use super::ChatState;
use super::handler::CommandHandler;
use crate::core::error::DocChatError;
use crate::service::UploadRequest;
use crate::service::types::{group_documents, with_all_option};
use crate::utils::text::preview;
use async_trait::async_trait;
use console::style;
use std::path::PathBuf;

const PREVIEW_CHARS: usize = 600;

pub struct CategoriesCommand;
pub struct DocsCommand;
pub struct UseCommand;
pub struct UnuseCommand;
pub struct ViewCommand;
pub struct UploadCommand;
pub struct RemoveCommand;

#[async_trait]
impl CommandHandler for CategoriesCommand {
    async fn execute(
        &self,
        state: &mut ChatState,
        _args: &[&str],
    ) -> Result<Option<String>, DocChatError> {
        let categories = with_all_option(state.documents.categories().await?);
        let current = state.session.category();

        let lines: Vec<String> = categories
            .iter()
            .map(|c| {
                if c == current {
                    format!("{} {}", style("*").green().bold(), style(c).green())
                } else {
                    format!("  {}", c)
                }
            })
            .collect();
        Ok(Some(lines.join("\n")))
    }

    fn help(&self) -> &'static str {
        "/categories - List the categories known to the service"
    }
}

#[async_trait]
impl CommandHandler for DocsCommand {
    async fn execute(
        &self,
        state: &mut ChatState,
        args: &[&str],
    ) -> Result<Option<String>, DocChatError> {
        let group = (!args.is_empty()).then(|| args.join(" "));
        let documents = state.documents.documents(group.as_deref()).await?;
        if documents.is_empty() {
            return Ok(Some("No documents found.".to_string()));
        }

        let selected = state.session.document().map(|d| d.document_id.clone());
        let mut lines = Vec::new();
        for (label, docs) in group_documents(&documents) {
            lines.push(style(format!("📁 {}", label)).bold().to_string());
            for doc in docs {
                let marker = if selected.as_deref() == Some(doc.id.as_str()) {
                    style("*").green().bold().to_string()
                } else {
                    " ".to_string()
                };
                lines.push(format!(
                    " {} {} {}",
                    marker,
                    style(format!("[{}]", doc.id)).dim(),
                    doc.display_name()
                ));
            }
        }
        Ok(Some(lines.join("\n")))
    }

    fn help(&self) -> &'static str {
        "/docs [group] - List uploaded documents, optionally from one group"
    }
}

#[async_trait]
impl CommandHandler for UseCommand {
    async fn execute(
        &self,
        state: &mut ChatState,
        args: &[&str],
    ) -> Result<Option<String>, DocChatError> {
        let Some(id) = args.first() else {
            return Ok(Some("Usage: /use <document id>".to_string()));
        };

        let documents = state.documents.documents(None).await?;
        let document = documents
            .iter()
            .find(|d| d.id == *id)
            .ok_or_else(|| DocChatError::Input(format!("No document with id {}", id)))?;

        let reference = document.to_ref();
        let confirmation = format!(
            "Next message will reference: {} ({})",
            reference.display_name,
            reference.group_label()
        );
        state.session.select_document(Some(reference));
        Ok(Some(confirmation))
    }

    fn help(&self) -> &'static str {
        "/use <id> - Attach a document to your next message"
    }
}

#[async_trait]
impl CommandHandler for UnuseCommand {
    async fn execute(
        &self,
        state: &mut ChatState,
        _args: &[&str],
    ) -> Result<Option<String>, DocChatError> {
        if state.session.document().is_none() {
            return Ok(Some("No document selected.".to_string()));
        }
        state.session.select_document(None);
        Ok(Some("Document selection cleared.".to_string()))
    }

    fn help(&self) -> &'static str {
        "/unuse - Clear the selected document"
    }
}

#[async_trait]
impl CommandHandler for ViewCommand {
    async fn execute(
        &self,
        state: &mut ChatState,
        args: &[&str],
    ) -> Result<Option<String>, DocChatError> {
        let Some(id) = args.first() else {
            return Ok(Some("Usage: /view <document id>".to_string()));
        };

        let record = state.documents.document(id).await?;
        let mut lines = vec![
            style(record.name.as_deref().unwrap_or("Untitled document"))
                .bold()
                .to_string(),
        ];
        for (key, value) in &record.extra {
            let value = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            lines.push(format!("{}: {}", style(key).dim(), value));
        }
        match record.preview.as_deref() {
            Some(text) if !text.trim().is_empty() => {
                lines.push(String::new());
                lines.push(preview(text.trim(), PREVIEW_CHARS));
            }
            _ => lines.push(style("No preview available.").dim().to_string()),
        }
        Ok(Some(lines.join("\n")))
    }

    fn help(&self) -> &'static str {
        "/view <id> - Show a document's details and a preview of its text"
    }
}

#[async_trait]
impl CommandHandler for UploadCommand {
    async fn execute(
        &self,
        state: &mut ChatState,
        args: &[&str],
    ) -> Result<Option<String>, DocChatError> {
        let [path, rest @ ..] = args else {
            return Ok(Some(
                "Usage: /upload <path> [group] [description...]".to_string(),
            ));
        };

        let path = PathBuf::from(path);
        if !path.is_file() {
            return Err(DocChatError::Input(format!(
                "File not found: {}",
                path.display()
            )));
        }

        let upload = UploadRequest {
            path,
            group: rest.first().map(|g| g.to_string()),
            description: rest
                .get(1..)
                .filter(|words| !words.is_empty())
                .map(|words| words.join(" ")),
        };
        let receipt = state.documents.upload(&upload).await?;
        Ok(Some(receipt))
    }

    fn help(&self) -> &'static str {
        "/upload <path> [group] [description] - Upload a file for retrieval"
    }
}

#[async_trait]
impl CommandHandler for RemoveCommand {
    async fn execute(
        &self,
        state: &mut ChatState,
        args: &[&str],
    ) -> Result<Option<String>, DocChatError> {
        let Some(id) = args.first() else {
            return Ok(Some("Usage: /remove <document id>".to_string()));
        };

        state.documents.delete_document(id).await?;
        if state
            .session
            .document()
            .is_some_and(|d| d.document_id == *id)
        {
            state.session.select_document(None);
        }
        Ok(Some(format!("Document {} deleted.", id)))
    }

    fn help(&self) -> &'static str {
        "/remove <id> - Delete an uploaded document"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{FakeStore, chat_state, document};
    use crate::service::testing::FakeAiService;
    use std::sync::Arc;

    fn store() -> Arc<FakeStore> {
        Arc::new(FakeStore {
            documents: vec![
                document("1", "Dystonia overview", Some("Neurology")),
                document("2", "Gene panel", None),
                document("3", "Tremor guide", Some("Neurology")),
            ],
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_categories_lead_with_all() {
        let mut state = chat_state(vec![], store());

        let output = CategoriesCommand
            .execute(&mut state, &[])
            .await
            .unwrap()
            .unwrap();
        let first = output.lines().next().unwrap();
        assert!(first.contains("All"));
        assert!(output.contains("Neurology"));
    }

    #[tokio::test]
    async fn test_docs_are_grouped() {
        let mut state = chat_state(vec![], store());

        let output = DocsCommand.execute(&mut state, &[]).await.unwrap().unwrap();
        let neurology = output.find("Neurology").unwrap();
        let without = output.find("Without group").unwrap();
        assert!(neurology < without);
        assert!(output.contains("Tremor guide"));

        let filtered = DocsCommand
            .execute(&mut state, &["Neurology"])
            .await
            .unwrap()
            .unwrap();
        assert!(!filtered.contains("Gene panel"));
    }

    #[tokio::test]
    async fn test_use_attaches_document_to_next_message_only() {
        let mut state = chat_state(
            vec![FakeAiService::answer("a"), FakeAiService::answer("b")],
            store(),
        );

        UseCommand.execute(&mut state, &["3"]).await.unwrap();
        assert_eq!(
            state.session.document().map(|d| d.display_name.as_str()),
            Some("Tremor guide")
        );

        state.session.compose_draft("Summarize it");
        state.session.send().await.unwrap();
        state.session.compose_draft("And again");
        state.session.send().await.unwrap();

        let messages = state.session.messages();
        assert_eq!(
            messages[0].document_ref.as_ref().map(|d| d.document_id.as_str()),
            Some("3")
        );
        assert!(messages[2].document_ref.is_none());
    }

    #[tokio::test]
    async fn test_use_unknown_document_is_an_error() {
        let mut state = chat_state(vec![], store());

        assert!(UseCommand.execute(&mut state, &["99"]).await.is_err());
        assert!(state.session.document().is_none());
    }

    #[tokio::test]
    async fn test_remove_clears_matching_selection() {
        let store = store();
        let mut state = chat_state(vec![], store.clone());
        UseCommand.execute(&mut state, &["1"]).await.unwrap();

        RemoveCommand.execute(&mut state, &["1"]).await.unwrap();

        assert!(state.session.document().is_none());
        assert_eq!(*store.deleted.lock().unwrap(), vec!["1".to_string()]);
    }

    #[tokio::test]
    async fn test_upload_rejects_missing_file() {
        let mut state = chat_state(vec![], store());

        let result = UploadCommand
            .execute(&mut state, &["/definitely/not/here.pdf"])
            .await;
        assert!(matches!(result, Err(DocChatError::Input(_))));
    }

    #[tokio::test]
    async fn test_upload_sends_existing_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_string_lossy().to_string();
        let mut state = chat_state(vec![], store());

        let output = UploadCommand
            .execute(&mut state, &[path.as_str(), "Neurology", "clinic", "notes"])
            .await
            .unwrap();
        assert_eq!(output, Some(format!("uploaded {}", path)));
    }
}
