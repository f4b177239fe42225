use crate::chat::DocumentRef;
use crate::core::error::DocChatError;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::path::PathBuf;

/// Category sentinel meaning "do not filter by category"
pub const ALL_CATEGORIES: &str = "All";

/// Source label for answers that arrive as a bare string
pub const DEFAULT_ANSWER_SOURCE: &str = "api";

/// Query parameters shared by `/ai_prompt` and `/ai_prompt_stream`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AiQuery {
    pub prompt: String,
    pub use_docs: bool,
    pub category: String,
}

/// A complete answer from the synchronous endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
    pub source: Option<String>,
}

impl Answer {
    /// Normalizes the `/ai_prompt` payload, which is either a bare string or an object
    /// carrying a `response` string and an optional `source`. Bare strings are labelled
    /// with [`DEFAULT_ANSWER_SOURCE`].
    pub fn from_payload(payload: Value) -> Result<Self, DocChatError> {
        match payload {
            Value::String(text) => Ok(Answer {
                text,
                source: Some(DEFAULT_ANSWER_SOURCE.to_string()),
            }),
            Value::Object(mut fields) => {
                let source = fields
                    .get("source")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                match fields.remove("response") {
                    Some(Value::String(text)) => Ok(Answer { text, source }),
                    Some(other) => Err(DocChatError::Serialization(format!(
                        "`response` is not a string: {}",
                        other
                    ))),
                    None => Err(DocChatError::Serialization(
                        "answer payload has no `response` field".to_string(),
                    )),
                }
            }
            other => Err(DocChatError::Serialization(format!(
                "unexpected answer payload: {}",
                other
            ))),
        }
    }
}

/// One decoded event of `/ai_prompt_stream`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Fragment(String),
    Done,
}

impl StreamEvent {
    pub fn from_data(data: &str) -> Result<Self, DocChatError> {
        let value: Value = serde_json::from_str(data).map_err(|e| {
            DocChatError::Stream(format!("unparsable event `{}`: {}", data, e))
        })?;

        if value.get("done").and_then(Value::as_bool) == Some(true) {
            return Ok(StreamEvent::Done);
        }
        if let Some(text) = value.get("response").and_then(Value::as_str) {
            return Ok(StreamEvent::Fragment(text.to_string()));
        }
        if let Some(message) = value.get("error").and_then(Value::as_str) {
            return Err(DocChatError::Api(message.to_string()));
        }

        Err(DocChatError::Stream(format!("unexpected event: {}", data)))
    }
}

fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number id, got {}",
            other
        ))),
    }
}

fn optional_id_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a string or number id, got {}",
            other
        ))),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CategoryList {
    #[serde(default)]
    pub categories: Vec<String>,
}

/// Prepends the "All" sentinel to a server category list.
pub fn with_all_option(categories: Vec<String>) -> Vec<String> {
    let mut options = vec![ALL_CATEGORIES.to_string()];
    options.extend(categories.into_iter().filter(|c| c != ALL_CATEGORIES));
    options
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DocumentSummary {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub citation: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
}

impl DocumentSummary {
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.citation.as_deref())
            .unwrap_or("Untitled document")
    }

    pub fn to_ref(&self) -> DocumentRef {
        DocumentRef {
            document_id: self.id.clone(),
            display_name: self.display_name().to_string(),
            group: self.group.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DocumentList {
    #[serde(default)]
    pub documents: Vec<DocumentSummary>,
}

/// Groups documents by their group label, keeping the order in which groups first appear.
pub fn group_documents(documents: &[DocumentSummary]) -> Vec<(String, Vec<&DocumentSummary>)> {
    let mut groups: Vec<(String, Vec<&DocumentSummary>)> = Vec::new();
    for doc in documents {
        let label = doc.to_ref().group_label().to_string();
        match groups.iter_mut().find(|(name, _)| *name == label) {
            Some((_, docs)) => docs.push(doc),
            None => groups.push((label, vec![doc])),
        }
    }
    groups
}

/// Full record returned by `/document/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentRecord {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub preview: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub path: PathBuf,
    pub description: Option<String>,
    pub group: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UploadReceipt {
    #[serde(default)]
    pub message: Option<String>,
}

/// A curated chat excerpt kept in the feedback dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetItem {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "optional_id_as_string"
    )]
    pub id: Option<String>,
    pub content: String,
    #[serde(rename = "additionalInfo", default)]
    pub additional_info: String,
    #[serde(default)]
    pub timestamp: String,
}

impl DatasetItem {
    pub fn new(content: impl Into<String>, additional_info: impl Into<String>) -> Self {
        Self {
            id: None,
            content: content.into(),
            additional_info: additional_info.into(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DatasetList {
    #[serde(default)]
    pub items: Vec<DatasetItem>,
}
