use std::pin::Pin;

use futures::StreamExt as _;
use tracing::debug;

use crate::config::ClientConfig;
use crate::errors::{ClientError, StreamFailure};
use crate::request::PlanRequest;

/// Raw response body, chunked however the network delivered it.
pub type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, StreamFailure>> + Send + 'static>>;

/// Opens the long-lived response for one planning request.
///
/// Dropping the returned stream must release the underlying connection.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn open(&self, request: &PlanRequest) -> Result<ByteStream, StreamFailure>;
}

/// `reqwest`-backed transport that POSTs the request as JSON and accepts an
/// event-stream response.
pub struct HttpTransport {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpTransport {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let mut builder = reqwest::Client::builder().connect_timeout(config.connect_timeout);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ClientError::config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn open(&self, request: &PlanRequest) -> Result<ByteStream, StreamFailure> {
        debug!(thread_id = %request.thread_id, url = %self.config.server_url, "opening planner stream");
        let response = self
            .client
            .post(self.config.server_url.trim())
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(request)
            .send()
            .await
            .map_err(|e| StreamFailure::transport(format!("planner request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(StreamFailure::Status {
                status: status.as_u16(),
                body,
            });
        }

        let stream = response.bytes_stream().map(|chunk| {
            chunk.map_err(|e| StreamFailure::transport(format!("planner stream read failed: {e}")))
        });
        Ok(Box::pin(stream))
    }
}
