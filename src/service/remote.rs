use super::http_client::HttpClient;
use super::types::{CategoryList, DatasetList, DocumentList, UploadReceipt};
use super::{
    AiQuery, AiService, Answer, DatasetItem, DatasetStore, DocumentRecord, DocumentStore,
    DocumentSummary, EventStream, UploadRequest,
};
use crate::config::ServiceConfig;
use crate::core::error::DocChatError;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::time::Duration;

const AI_PROMPT: &str = "ai_prompt";
const AI_PROMPT_STREAM: &str = "ai_prompt_stream";
const CATEGORIES: &str = "categories";
const DOCUMENTS: &str = "documents";
const DOCUMENT: &str = "document";
const UPLOAD_DOCUMENT: &str = "upload_document";
const ADD_TO_DATASET: &str = "add_to_dataset";
const DATASET: &str = "dataset";
const NO_QUERY: &[(&str, &str)] = &[];

/// HTTP client for the retrieval service: Q&A, document store and dataset endpoints.
#[derive(Clone)]
pub struct RemoteService {
    client: HttpClient,
}

impl RemoteService {
    pub fn new(config: &ServiceConfig) -> Result<Self, DocChatError> {
        let client = HttpClient::new(
            config.base_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )?;
        Ok(Self { client })
    }
}

#[async_trait]
impl AiService for RemoteService {
    async fn ask(&self, query: &AiQuery) -> Result<Answer, DocChatError> {
        let payload = self.client.get_payload(AI_PROMPT, query).await?;
        Answer::from_payload(payload)
    }

    async fn ask_stream(&self, query: &AiQuery) -> Result<EventStream, DocChatError> {
        self.client.get_event_stream(AI_PROMPT_STREAM, query).await
    }
}

#[async_trait]
impl DocumentStore for RemoteService {
    async fn categories(&self) -> Result<Vec<String>, DocChatError> {
        let list: CategoryList = self.client.get_json(CATEGORIES, NO_QUERY).await?;
        Ok(list.categories)
    }

    async fn documents(&self, group: Option<&str>) -> Result<Vec<DocumentSummary>, DocChatError> {
        let query: Vec<(&str, &str)> = group.map(|g| vec![("group", g)]).unwrap_or_default();
        let list: DocumentList = self.client.get_json(DOCUMENTS, &query).await?;
        Ok(list.documents)
    }

    async fn document(&self, id: &str) -> Result<DocumentRecord, DocChatError> {
        self.client
            .get_json(&format!("{}/{}", DOCUMENT, id), NO_QUERY)
            .await
    }

    async fn upload(&self, upload: &UploadRequest) -> Result<String, DocChatError> {
        let file_name = upload
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                DocChatError::Input(format!("Not a file path: {}", upload.path.display()))
            })?
            .to_string();
        let bytes = tokio::fs::read(&upload.path).await?;

        let description = upload
            .description
            .clone()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| file_name.clone());

        let mut form = Form::new()
            .part("file", Part::bytes(bytes).file_name(file_name))
            .text("description", description);
        if let Some(group) = upload.group.clone() {
            form = form.text("group", group);
        }

        let response = self.client.post_multipart(UPLOAD_DOCUMENT, form).await?;
        let body = response.text().await?;
        let message = serde_json::from_str::<UploadReceipt>(&body)
            .ok()
            .and_then(|receipt| receipt.message);
        Ok(message.unwrap_or_else(|| "Document successfully uploaded".to_string()))
    }

    async fn delete_document(&self, id: &str) -> Result<(), DocChatError> {
        self.client
            .delete(&format!("{}/{}", DOCUMENTS, id))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl DatasetStore for RemoteService {
    async fn add_item(&self, item: &DatasetItem) -> Result<(), DocChatError> {
        self.client.post_json(ADD_TO_DATASET, item).await?;
        Ok(())
    }

    async fn items(&self) -> Result<Vec<DatasetItem>, DocChatError> {
        let list: DatasetList = self.client.get_json(DATASET, NO_QUERY).await?;
        Ok(list.items)
    }

    async fn update_item(&self, id: &str, item: &DatasetItem) -> Result<(), DocChatError> {
        self.client
            .put_json(&format!("{}/{}", DATASET, id), item)
            .await?;
        Ok(())
    }

    async fn delete_item(&self, id: &str) -> Result<(), DocChatError> {
        self.client.delete(&format!("{}/{}", DATASET, id)).await?;
        Ok(())
    }
}
