//! Fake transports for session and conversation tests.

use std::sync::Mutex;

use futures::stream;
use tokio::sync::mpsc;

use crate::errors::StreamFailure;
use crate::request::PlanRequest;
use crate::transport::{ByteStream, Transport};

pub(crate) fn chunks(parts: &[&str]) -> Vec<bytes::Bytes> {
    parts
        .iter()
        .map(|part| bytes::Bytes::from(part.as_bytes().to_vec()))
        .collect()
}

enum Script {
    Body(Vec<bytes::Bytes>),
    Fail(StreamFailure),
}

/// Replays a fixed body for every request and records what was sent.
pub(crate) struct ScriptedTransport {
    script: Script,
    requests: Mutex<Vec<PlanRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new(body: Vec<bytes::Bytes>) -> Self {
        Self {
            script: Script::Body(body),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing(failure: StreamFailure) -> Self {
        Self {
            script: Script::Fail(failure),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn requests(&self) -> Vec<PlanRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn open(&self, request: &PlanRequest) -> Result<ByteStream, StreamFailure> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());
        match &self.script {
            Script::Body(body) => Ok(Box::pin(stream::iter(
                body.clone().into_iter().map(Ok).collect::<Vec<_>>(),
            ))),
            Script::Fail(failure) => Err(failure.clone()),
        }
    }
}

/// Body fed chunk by chunk from the test; stays open until the sender drops.
pub(crate) struct ChannelTransport {
    rx: Mutex<Option<mpsc::UnboundedReceiver<bytes::Bytes>>>,
}

impl ChannelTransport {
    pub(crate) fn new() -> (Self, mpsc::UnboundedSender<bytes::Bytes>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                rx: Mutex::new(Some(rx)),
            },
            tx,
        )
    }
}

#[async_trait::async_trait]
impl Transport for ChannelTransport {
    async fn open(&self, _request: &PlanRequest) -> Result<ByteStream, StreamFailure> {
        let rx = self
            .rx
            .lock()
            .expect("channel lock")
            .take()
            .ok_or_else(|| StreamFailure::transport("channel transport already opened"))?;
        Ok(Box::pin(stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|chunk| (Ok(chunk), rx))
        })))
    }
}
