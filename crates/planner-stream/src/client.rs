use std::sync::Arc;

use tracing::debug;

use crate::config::ClientConfig;
use crate::errors::ClientError;
use crate::request::PlanRequest;
use crate::stream::{EventStream, spawn_session};
use crate::transport::{HttpTransport, Transport};

/// Entry point for opening planner sessions.
#[derive(Clone)]
pub struct PlannerClient {
    transport: Arc<dyn Transport>,
    stream_buffer_capacity: usize,
}

impl PlannerClient {
    /// Creates a client that talks HTTP to `config.server_url`.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let capacity = config.stream_buffer_capacity;
        let transport = HttpTransport::new(config)?;
        Ok(Self {
            transport: Arc::new(transport),
            stream_buffer_capacity: capacity,
        })
    }

    /// Creates a client from `PLANNER_*` environment variables.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Creates a client over a custom transport.
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            stream_buffer_capacity: 64,
        }
    }

    /// Overrides the bounded event buffer between the session task and the consumer.
    pub fn stream_buffer_capacity(mut self, capacity: usize) -> Self {
        self.stream_buffer_capacity = capacity;
        self
    }

    /// Validates `request` and starts streaming its response.
    ///
    /// Transport failures are not returned here: they arrive as the terminal
    /// item of the returned stream. Must be called from within a Tokio runtime.
    pub fn open(&self, request: PlanRequest) -> Result<EventStream, ClientError> {
        request.validate()?;
        if self.stream_buffer_capacity == 0 {
            return Err(ClientError::validation(
                "stream_buffer_capacity must be greater than 0",
            ));
        }
        debug!(thread_id = %request.thread_id, "starting planner session");
        Ok(spawn_session(
            self.transport.clone(),
            request,
            self.stream_buffer_capacity,
        ))
    }
}
