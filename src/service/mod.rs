pub mod http_client;
pub mod remote;
pub mod sse;
pub mod types;

use crate::core::error::DocChatError;
use async_trait::async_trait;
use futures::stream::BoxStream;

pub use remote::RemoteService;
pub use types::{
    ALL_CATEGORIES, AiQuery, Answer, DatasetItem, DocumentRecord, DocumentSummary, StreamEvent,
    UploadRequest,
};

/// Incremental reply events, in arrival order
pub type EventStream = BoxStream<'static, Result<StreamEvent, DocChatError>>;

/// The question-answering endpoints of the retrieval service
#[async_trait]
pub trait AiService: Send + Sync {
    async fn ask(&self, query: &AiQuery) -> Result<Answer, DocChatError>;

    async fn ask_stream(&self, query: &AiQuery) -> Result<EventStream, DocChatError>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn categories(&self) -> Result<Vec<String>, DocChatError>;

    async fn documents(&self, group: Option<&str>) -> Result<Vec<DocumentSummary>, DocChatError>;

    async fn document(&self, id: &str) -> Result<DocumentRecord, DocChatError>;

    /// Uploads a file and returns the service's confirmation message.
    async fn upload(&self, upload: &UploadRequest) -> Result<String, DocChatError>;

    async fn delete_document(&self, id: &str) -> Result<(), DocChatError>;
}

#[async_trait]
pub trait DatasetStore: Send + Sync {
    async fn add_item(&self, item: &DatasetItem) -> Result<(), DocChatError>;

    async fn items(&self) -> Result<Vec<DatasetItem>, DocChatError>;

    async fn update_item(&self, id: &str, item: &DatasetItem) -> Result<(), DocChatError>;

    async fn delete_item(&self, id: &str) -> Result<(), DocChatError>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted stand-ins for the remote service.

    use super::*;
    use futures::stream::{self, StreamExt};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    pub enum Script {
        Answer(Result<Answer, DocChatError>),
        Events(Vec<Result<StreamEvent, DocChatError>>),
        /// Event stream that yields the given events and then never finishes
        Stalled(Vec<Result<StreamEvent, DocChatError>>),
        OpenFailure(DocChatError),
        /// Stream request whose response never arrives
        NeverOpens,
    }

    /// Counts drops of the event streams it hands out.
    struct DropProbe(Arc<AtomicUsize>);

    impl DropProbe {
        fn alive(&self) {}
    }

    impl Drop for DropProbe {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    pub struct FakeAiService {
        scripts: Mutex<VecDeque<Script>>,
        pub queries: Mutex<Vec<AiQuery>>,
        pub streams_dropped: Arc<AtomicUsize>,
    }

    impl FakeAiService {
        pub fn new(scripts: Vec<Script>) -> Arc<Self> {
            Arc::new(Self {
                scripts: Mutex::new(scripts.into()),
                ..Default::default()
            })
        }

        pub fn answer(text: &str) -> Script {
            Script::Answer(Ok(Answer {
                text: text.to_string(),
                source: None,
            }))
        }

        pub fn fragments(parts: &[&str]) -> Script {
            let mut events: Vec<Result<StreamEvent, DocChatError>> = parts
                .iter()
                .map(|p| Ok(StreamEvent::Fragment(p.to_string())))
                .collect();
            events.push(Ok(StreamEvent::Done));
            Script::Events(events)
        }

        pub fn query_count(&self) -> usize {
            self.queries.lock().unwrap().len()
        }

        fn next_script(&self, query: &AiQuery) -> Script {
            self.queries.lock().unwrap().push(query.clone());
            self.scripts
                .lock()
                .unwrap()
                .pop_front()
                .expect("no scripted response left")
        }

        fn probe_stream(
            &self,
            events: Vec<Result<StreamEvent, DocChatError>>,
            stall: bool,
        ) -> EventStream {
            let probe = DropProbe(self.streams_dropped.clone());
            let scripted = stream::iter(events).map(move |event| {
                probe.alive();
                event
            });
            if stall {
                scripted.chain(stream::pending()).boxed()
            } else {
                scripted.boxed()
            }
        }
    }

    #[async_trait]
    impl AiService for FakeAiService {
        async fn ask(&self, query: &AiQuery) -> Result<Answer, DocChatError> {
            match self.next_script(query) {
                Script::Answer(result) => result,
                Script::OpenFailure(e) => Err(e),
                _ => panic!("sync query received a streaming script"),
            }
        }

        async fn ask_stream(&self, query: &AiQuery) -> Result<EventStream, DocChatError> {
            match self.next_script(query) {
                Script::Events(events) => Ok(self.probe_stream(events, false)),
                Script::Stalled(events) => Ok(self.probe_stream(events, true)),
                Script::OpenFailure(e) => Err(e),
                Script::NeverOpens => std::future::pending().await,
                Script::Answer(_) => panic!("stream query received a sync script"),
            }
        }
    }
}
