use super::EventStream;
use super::sse::event_stream;
use crate::core::error::DocChatError;
use reqwest::multipart::Form;
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// Thin wrapper over `reqwest` bound to the service base URL.
///
/// One-shot requests carry the configured timeout; event streams do not, their
/// liveness is bounded by the dispatcher's inactivity timeout instead.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    request_timeout: Duration,
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self, DocChatError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            request_timeout,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, DocChatError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DocChatError::Api(format!(
                "Service returned {}: {}",
                status,
                body.trim()
            )));
        }
        Ok(response)
    }

    pub async fn get_json<T, Q>(&self, path: &str, query: &Q) -> Result<T, DocChatError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let url = self.url(path);
        tracing::debug!("GET {}", url);

        let request = self
            .client
            .get(&url)
            .query(query)
            .timeout(self.request_timeout);
        let body = self.send(request).await?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Fetches a body that may be JSON or plain text. A JSON content type must parse;
    /// other bodies are parsed when they hold a JSON object or string and are otherwise
    /// returned as a string value.
    pub async fn get_payload<Q>(&self, path: &str, query: &Q) -> Result<Value, DocChatError>
    where
        Q: Serialize + ?Sized,
    {
        let url = self.url(path);
        tracing::debug!("GET {}", url);

        let request = self
            .client
            .get(&url)
            .query(query)
            .timeout(self.request_timeout);
        let response = self.send(request).await?;
        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("json"));
        let body = response.text().await?;

        if is_json {
            Ok(serde_json::from_str(&body)?)
        } else {
            Ok(lenient_payload(body))
        }
    }

    pub async fn get_event_stream<Q>(&self, path: &str, query: &Q) -> Result<EventStream, DocChatError>
    where
        Q: Serialize + ?Sized,
    {
        let url = self.url(path);
        tracing::debug!("GET {} (event stream)", url);

        let request = self
            .client
            .get(&url)
            .query(query)
            .header(reqwest::header::ACCEPT, "text/event-stream");
        let response = self.send(request).await?;
        Ok(event_stream(response.bytes_stream()))
    }

    pub async fn post_json<B>(&self, path: &str, body: &B) -> Result<Response, DocChatError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.url(path);
        tracing::debug!("POST {}", url);

        let request = self
            .client
            .post(&url)
            .json(body)
            .timeout(self.request_timeout);
        self.send(request).await
    }

    pub async fn put_json<B>(&self, path: &str, body: &B) -> Result<Response, DocChatError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.url(path);
        tracing::debug!("PUT {}", url);

        let request = self
            .client
            .put(&url)
            .json(body)
            .timeout(self.request_timeout);
        self.send(request).await
    }

    pub async fn delete(&self, path: &str) -> Result<Response, DocChatError> {
        let url = self.url(path);
        tracing::debug!("DELETE {}", url);

        let request = self.client.delete(&url).timeout(self.request_timeout);
        self.send(request).await
    }

    pub async fn post_multipart(&self, path: &str, form: Form) -> Result<Response, DocChatError> {
        let url = self.url(path);
        tracing::debug!("POST {} (multipart)", url);

        // uploads can be large, so no request timeout here
        let request = self.client.post(&url).multipart(form);
        self.send(request).await
    }
}

/// Reads a body served without a JSON content type. Only objects and strings count as
/// JSON here so that a plain answer such as `42` stays text.
fn lenient_payload(body: String) -> Value {
    match serde_json::from_str::<Value>(&body) {
        Ok(value @ (Value::Object(_) | Value::String(_))) => value,
        _ => Value::String(body),
    }
}
