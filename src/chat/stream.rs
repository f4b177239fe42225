use crate::core::error::DocChatError;
use crate::service::{EventStream, StreamEvent};
use futures::StreamExt;
use std::time::Duration;

/// An open reply stream. Closing drops the underlying connection; it happens at most
/// once no matter how many times `close` is called.
pub struct StreamConnection {
    events: Option<EventStream>,
    idle_timeout: Duration,
}

impl StreamConnection {
    pub fn new(events: EventStream, idle_timeout: Duration) -> Self {
        Self {
            events: Some(events),
            idle_timeout,
        }
    }

    pub fn is_open(&self) -> bool {
        self.events.is_some()
    }

    /// Waits for the next event. `Ok(None)` means the stream is closed or the server
    /// ended the body.
    pub async fn next_event(&mut self) -> Result<Option<StreamEvent>, DocChatError> {
        let Some(events) = self.events.as_mut() else {
            return Ok(None);
        };

        match tokio::time::timeout(self.idle_timeout, events.next()).await {
            Ok(Some(event)) => event.map(Some),
            Ok(None) => Ok(None),
            Err(_) => Err(DocChatError::Timeout(format!(
                "no event received for {}s",
                self.idle_timeout.as_secs_f32()
            ))),
        }
    }

    /// Returns `true` if this call released the connection.
    pub fn close(&mut self) -> bool {
        match self.events.take() {
            Some(events) => {
                drop(events);
                tracing::debug!("reply stream closed");
                true
            }
            None => false,
        }
    }
}

impl Drop for StreamConnection {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Guard(Arc<AtomicUsize>);

    impl Drop for Guard {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn guarded(events: Vec<StreamEvent>, drops: &Arc<AtomicUsize>) -> EventStream {
        let guard = Guard(drops.clone());
        stream::iter(events)
            .map(move |event| {
                let _held = &guard;
                Ok(event)
            })
            .boxed()
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_releases_once() {
        let drops = Arc::new(AtomicUsize::new(0));
        let mut connection = StreamConnection::new(
            guarded(vec![StreamEvent::Done], &drops),
            Duration::from_secs(1),
        );

        assert!(connection.close());
        assert!(!connection.close());
        assert!(!connection.is_open());
        assert_eq!(drops.load(Ordering::SeqCst), 1);

        assert!(connection.next_event().await.unwrap().is_none());
        drop(connection);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_drop_without_close_releases_connection() {
        let drops = Arc::new(AtomicUsize::new(0));
        let connection = StreamConnection::new(
            guarded(vec![StreamEvent::Done], &drops),
            Duration::from_secs(1),
        );
        drop(connection);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_idle_stream_times_out() {
        let mut connection = StreamConnection::new(
            stream::pending().boxed(),
            Duration::from_millis(20),
        );
        assert!(matches!(
            connection.next_event().await,
            Err(DocChatError::Timeout(_))
        ));
    }
}
