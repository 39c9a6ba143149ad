/// Errors returned by the public client API before a stream exists.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Invalid client configuration (server URL, timeouts, buffer sizes).
    #[error("config error: {0}")]
    Config(String),
    /// Invalid caller input (blank query, inconsistent planner settings).
    #[error("validation error: {0}")]
    Validation(String),
}

impl ClientError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// Terminal failure delivered as the last item of an `EventStream`.
///
/// Every variant ends the session. None of them are retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, serde::Serialize, serde::Deserialize)]
pub enum StreamFailure {
    /// Connection, timeout, or body read failure.
    #[error("transport failure: {message}")]
    Transport { message: String },
    /// Backend answered with a non-2xx status.
    #[error("backend responded with status {status}: {body}")]
    Status { status: u16, body: String },
    /// The caller aborted the session.
    #[error("stream cancelled")]
    Cancelled,
}

impl StreamFailure {
    /// Creates a transport-level failure.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Returns `true` for caller-initiated cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Error produced while classifying a single frame.
///
/// Never fatal: the frame is dropped and the session keeps reading.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameDecodeError {
    /// The `[FINAL_OUTPUT]` body was not a transcript document.
    #[error("malformed final result: {reason}")]
    MalformedFinalResult { reason: String },
}
