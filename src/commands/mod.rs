pub mod dataset;
pub mod dispatcher;
pub mod documents;
pub mod handler;
pub mod registry;

use crate::chat::{ChatSession, Message};
use crate::core::error::DocChatError;
use crate::service::{DatasetStore, DocumentStore};
use std::sync::Arc;

pub use dispatcher::create_command_registry;

/// Builds a fresh session with the configured defaults
pub type SessionFactory = Box<dyn Fn() -> ChatSession + Send + Sync>;

pub struct ChatState {
    pub session: ChatSession,
    pub documents: Arc<dyn DocumentStore>,
    pub dataset: Arc<dyn DatasetStore>,
    pub new_session: SessionFactory,
    pub should_continue: bool,
}

impl ChatState {
    pub fn new(
        new_session: SessionFactory,
        documents: Arc<dyn DocumentStore>,
        dataset: Arc<dyn DatasetStore>,
    ) -> Self {
        Self {
            session: new_session(),
            documents,
            dataset,
            new_session,
            should_continue: true,
        }
    }

    /// Looks up a message by the 1-based position shown in `/history`.
    pub fn message_at(&self, position: &str) -> Result<&Message, DocChatError> {
        let index: usize = position
            .trim_start_matches('#')
            .parse()
            .map_err(|_| DocChatError::Input(format!("Not a message number: {}", position)))?;
        index
            .checked_sub(1)
            .and_then(|i| self.session.messages().get(i))
            .ok_or_else(|| DocChatError::Input(format!("No message number {}", index)))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::chat::RequestDispatcher;
    use crate::config::ChatConfig;
    use crate::service::testing::{FakeAiService, Script};
    use crate::service::{DatasetItem, DocumentRecord, DocumentSummary, UploadRequest};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    pub struct FakeStore {
        pub documents: Vec<DocumentSummary>,
        pub items: Mutex<Vec<DatasetItem>>,
        pub deleted: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl DocumentStore for FakeStore {
        async fn categories(&self) -> Result<Vec<String>, DocChatError> {
            Ok(vec!["Neurology".to_string(), "Genetics".to_string()])
        }

        async fn documents(
            &self,
            group: Option<&str>,
        ) -> Result<Vec<DocumentSummary>, DocChatError> {
            Ok(self
                .documents
                .iter()
                .filter(|d| group.is_none() || d.group.as_deref() == group)
                .cloned()
                .collect())
        }

        async fn document(&self, id: &str) -> Result<DocumentRecord, DocChatError> {
            Err(DocChatError::Api(format!("Service returned 404: {}", id)))
        }

        async fn upload(&self, upload: &UploadRequest) -> Result<String, DocChatError> {
            Ok(format!("uploaded {}", upload.path.display()))
        }

        async fn delete_document(&self, id: &str) -> Result<(), DocChatError> {
            self.deleted.lock().unwrap().push(id.to_string());
            Ok(())
        }
    }

    #[async_trait]
    impl DatasetStore for FakeStore {
        async fn add_item(&self, item: &DatasetItem) -> Result<(), DocChatError> {
            let mut items = self.items.lock().unwrap();
            let mut item = item.clone();
            item.id = Some((items.len() + 1).to_string());
            items.push(item);
            Ok(())
        }

        async fn items(&self) -> Result<Vec<DatasetItem>, DocChatError> {
            Ok(self.items.lock().unwrap().clone())
        }

        async fn update_item(&self, id: &str, item: &DatasetItem) -> Result<(), DocChatError> {
            let mut items = self.items.lock().unwrap();
            let slot = items
                .iter_mut()
                .find(|i| i.id.as_deref() == Some(id))
                .ok_or_else(|| DocChatError::Api("Service returned 404".to_string()))?;
            *slot = item.clone();
            Ok(())
        }

        async fn delete_item(&self, id: &str) -> Result<(), DocChatError> {
            self.items
                .lock()
                .unwrap()
                .retain(|i| i.id.as_deref() != Some(id));
            Ok(())
        }
    }

    pub fn document(id: &str, name: &str, group: Option<&str>) -> DocumentSummary {
        DocumentSummary {
            id: id.to_string(),
            name: Some(name.to_string()),
            citation: None,
            source: Some("upload".to_string()),
            group: group.map(str::to_string),
        }
    }

    pub fn chat_state(scripts: Vec<Script>, store: Arc<FakeStore>) -> ChatState {
        let service = FakeAiService::new(scripts);
        let factory: SessionFactory = Box::new(move || {
            let dispatcher = RequestDispatcher::new(service.clone(), Duration::from_millis(50));
            ChatSession::new(dispatcher, &ChatConfig::default())
        });
        ChatState::new(factory, store.clone(), store)
    }
}
