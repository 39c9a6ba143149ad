use std::time::Duration;

use crate::errors::ClientError;

/// Environment variable holding the backend endpoint.
pub const SERVER_URL_ENV: &str = "PLANNER_SERVER_URL";
/// Optional whole-request timeout in seconds.
pub const TIMEOUT_ENV: &str = "PLANNER_TIMEOUT_SECS";
/// Optional connect timeout in seconds.
pub const CONNECT_TIMEOUT_ENV: &str = "PLANNER_CONNECT_TIMEOUT_SECS";
/// Optional event buffer size between the session task and the consumer.
pub const STREAM_BUFFER_ENV: &str = "PLANNER_STREAM_BUFFER";

/// Configuration for the planner HTTP client.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Full URL of the streaming endpoint (for example `http://localhost:8000/get_response`).
    pub server_url: String,
    /// Time allowed to establish the connection.
    pub connect_timeout: Duration,
    /// Optional cap on the whole exchange, body included.
    ///
    /// Unset by default: planning runs can stream for minutes.
    pub timeout: Option<Duration>,
    /// Bounded event buffer used by the session channel.
    pub stream_buffer_capacity: usize,
}

impl ClientConfig {
    /// Creates a config with defaults for the given endpoint.
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            connect_timeout: Duration::from_secs(10),
            timeout: None,
            stream_buffer_capacity: 64,
        }
    }

    /// Builds a config from `PLANNER_*` environment variables.
    pub fn from_env() -> Result<Self, ClientError> {
        let server_url = std::env::var(SERVER_URL_ENV).unwrap_or_default();
        if server_url.trim().is_empty() {
            return Err(ClientError::config(format!("missing {SERVER_URL_ENV}")));
        }
        let mut config = Self::new(server_url);
        if let Some(secs) = read_env_number::<u64>(TIMEOUT_ENV)? {
            config.timeout = Some(Duration::from_secs(secs));
        }
        if let Some(secs) = read_env_number::<u64>(CONNECT_TIMEOUT_ENV)? {
            config.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(capacity) = read_env_number::<usize>(STREAM_BUFFER_ENV)? {
            config.stream_buffer_capacity = capacity;
        }
        config.validate()?;
        Ok(config)
    }

    /// Overrides the endpoint URL.
    pub fn server_url(mut self, server_url: impl Into<String>) -> Self {
        self.server_url = server_url.into();
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn stream_buffer_capacity(mut self, capacity: usize) -> Self {
        self.stream_buffer_capacity = capacity;
        self
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        let url = reqwest::Url::parse(self.server_url.trim())
            .map_err(|e| ClientError::config(format!("invalid server url {:?}: {e}", self.server_url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::config(format!(
                "server url must be http or https, got {}",
                url.scheme()
            )));
        }
        if self.stream_buffer_capacity == 0 {
            return Err(ClientError::config(
                "stream_buffer_capacity must be greater than 0",
            ));
        }
        Ok(())
    }
}

fn read_env_number<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ClientError> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ClientError::config(format!("{key} must be a number, got {raw:?}"))),
        _ => Ok(None),
    }
}
