use std::collections::VecDeque;
use std::sync::Arc;

use futures::StreamExt as _;
use futures::stream;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error};
use uuid::Uuid;

use crate::errors::StreamFailure;
use crate::event::{Event, classify};
use crate::frame::FrameSplitter;
use crate::message::Transcript;
use crate::request::PlanRequest;
use crate::session::ThreadId;
use crate::transport::{ByteStream, Transport};

/// One item of an `EventStream`: an event, or the terminal failure.
pub type StreamItem = Result<Event, StreamFailure>;

/// Handle used to cancel a running session.
#[derive(Clone)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    /// Requests cancellation.
    ///
    /// Takes effect immediately for the consumer: events still buffered are
    /// discarded and the stream ends with `StreamFailure::Cancelled`.
    pub fn abort(&self) {
        let _ = self.tx.send(true);
    }

    pub fn is_aborted(&self) -> bool {
        *self.tx.borrow()
    }
}

/// How a session ended.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionOutcome {
    /// A `FinalResult` arrived.
    Completed(Transcript),
    /// The transport ended without a `FinalResult`.
    Exhausted,
    Failed(StreamFailure),
    Cancelled,
}

impl SessionOutcome {
    /// Folds one stream item into the outcome seen so far.
    pub fn observe(&mut self, item: &StreamItem) {
        match item {
            Ok(Event::FinalResult { payload }) => *self = Self::Completed(payload.clone()),
            Ok(Event::Status { .. }) => {}
            Err(StreamFailure::Cancelled) => *self = Self::Cancelled,
            Err(failure) => *self = Self::Failed(failure.clone()),
        }
    }
}

/// Ordered, cancellable sequence of events for one request.
///
/// Yields `Status` events, then either one `FinalResult`, one terminal
/// failure, or nothing if the backend closed the stream early. Dropping the
/// stream cancels the session.
pub struct EventStream {
    session_id: Uuid,
    thread_id: ThreadId,
    rx: mpsc::Receiver<StreamItem>,
    abort_handle: AbortHandle,
    done: bool,
}

impl EventStream {
    /// Identifies this session; unique per `open`, unlike the thread id.
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn thread_id(&self) -> &ThreadId {
        &self.thread_id
    }

    /// Returns a handle that can cancel the session from elsewhere.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort_handle.clone()
    }

    /// Waits for the next item. Returns `None` once the session is over.
    pub async fn next_event(&mut self) -> Option<StreamItem> {
        if self.done {
            return None;
        }
        if self.abort_handle.is_aborted() {
            return Some(self.end_cancelled());
        }

        let mut abort_rx = self.abort_handle.tx.subscribe();
        let received = tokio::select! {
            biased;
            _ = wait_for_abort(&mut abort_rx) => Received::Aborted,
            item = self.rx.recv() => Received::Item(item),
        };
        let item = match received {
            Received::Aborted => return Some(self.end_cancelled()),
            Received::Item(item) => item,
        };
        match item {
            Some(item) => {
                if matches!(item, Ok(Event::FinalResult { .. }) | Err(_)) {
                    self.done = true;
                }
                Some(item)
            }
            None => {
                self.done = true;
                None
            }
        }
    }

    /// Drains the stream and reports how the session ended.
    pub async fn finish(mut self) -> SessionOutcome {
        let mut outcome = SessionOutcome::Exhausted;
        while let Some(item) = self.next_event().await {
            outcome.observe(&item);
        }
        outcome
    }

    fn end_cancelled(&mut self) -> StreamItem {
        self.done = true;
        self.rx.close();
        Err(StreamFailure::Cancelled)
    }
}

enum Received {
    Aborted,
    Item(Option<StreamItem>),
}

impl Drop for EventStream {
    fn drop(&mut self) {
        self.abort_handle.abort();
    }
}

/// Starts the session task for `request` and returns its event stream.
///
/// Must be called from within a Tokio runtime.
pub(crate) fn spawn_session(
    transport: Arc<dyn Transport>,
    request: PlanRequest,
    capacity: usize,
) -> EventStream {
    let (tx, rx) = mpsc::channel(capacity);
    let (abort_tx, abort_rx) = watch::channel(false);
    let thread_id = request.thread_id.clone();
    let session_id = Uuid::new_v4();
    debug!(session_id = %session_id, thread_id = %thread_id, capacity, "spawning planner session");
    tokio::spawn(session_task(transport, request, tx, abort_rx));
    EventStream {
        session_id,
        thread_id,
        rx,
        abort_handle: AbortHandle { tx: abort_tx },
        done: false,
    }
}

async fn session_task(
    transport: Arc<dyn Transport>,
    request: PlanRequest,
    tx: mpsc::Sender<StreamItem>,
    mut abort_rx: watch::Receiver<bool>,
) {
    let thread_id = request.thread_id.clone();

    let opened = tokio::select! {
        biased;
        _ = wait_for_abort(&mut abort_rx) => {
            debug!(thread_id = %thread_id, "session cancelled before the response started");
            return;
        }
        opened = transport.open(&request) => opened,
    };
    let bytes = match opened {
        Ok(bytes) => bytes,
        Err(failure) => {
            error!(thread_id = %thread_id, error = %failure, "planner stream failed to open");
            deliver(&tx, &mut abort_rx, Err(failure)).await;
            return;
        }
    };

    let mut events = Box::pin(frame_events(bytes));
    let mut delivered = 0_u64;
    loop {
        let next = tokio::select! {
            biased;
            _ = wait_for_abort(&mut abort_rx) => None,
            next = events.next() => Some(next),
        };
        let Some(next) = next else {
            debug!(thread_id = %thread_id, delivered, "session cancelled");
            return;
        };
        let Some(item) = next else {
            debug!(thread_id = %thread_id, delivered, "planner stream ended without a final result");
            return;
        };

        let terminal = match &item {
            Ok(event) => event.is_final(),
            Err(failure) => {
                error!(thread_id = %thread_id, delivered, error = %failure, "planner stream failed");
                true
            }
        };
        match deliver(&tx, &mut abort_rx, item).await {
            Delivery::Sent => delivered += 1,
            Delivery::Aborted => {
                debug!(thread_id = %thread_id, delivered, "session cancelled with events pending");
                return;
            }
            Delivery::Closed => {
                debug!(thread_id = %thread_id, "event stream receiver dropped");
                return;
            }
        }
        if terminal {
            debug!(thread_id = %thread_id, delivered, "session finished");
            return;
        }
    }
}

enum Delivery {
    Sent,
    Aborted,
    Closed,
}

/// Queues `item` for the consumer. A full channel never outlives an abort.
async fn deliver(
    tx: &mpsc::Sender<StreamItem>,
    abort_rx: &mut watch::Receiver<bool>,
    item: StreamItem,
) -> Delivery {
    tokio::select! {
        biased;
        _ = wait_for_abort(abort_rx) => Delivery::Aborted,
        sent = tx.send(item) => match sent {
            Ok(()) => Delivery::Sent,
            Err(_) => Delivery::Closed,
        },
    }
}

async fn wait_for_abort(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Decodes a raw body into classified events.
///
/// Ends right after the first `FinalResult`, whatever follows it on the wire.
/// A transport error ends the stream with that error.
pub fn frame_events(bytes: ByteStream) -> impl futures::Stream<Item = StreamItem> + Send {
    struct State {
        bytes: ByteStream,
        splitter: FrameSplitter,
        pending: VecDeque<Event>,
        done: bool,
    }

    stream::try_unfold(
        State {
            bytes,
            splitter: FrameSplitter::new(),
            pending: VecDeque::new(),
            done: false,
        },
        |mut state| async move {
            loop {
                if let Some(event) = state.pending.pop_front() {
                    return Ok(Some((event, state)));
                }
                if state.done {
                    return Ok(None);
                }

                match state.bytes.next().await {
                    Some(Ok(chunk)) => {
                        let frames = state.splitter.feed(&chunk);
                        if !frames.is_empty() {
                            debug!(chunk_len = chunk.len(), frames = frames.len(), "frames completed");
                        }
                        for frame in frames {
                            let Some(event) = classify(&frame) else {
                                continue;
                            };
                            let terminal = event.is_final();
                            state.pending.push_back(event);
                            if terminal {
                                state.done = true;
                                break;
                            }
                        }
                    }
                    Some(Err(failure)) => return Err(failure),
                    None => {
                        state.splitter.finish();
                        state.done = true;
                    }
                }
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{AgentKind, Message};
    use crate::testing::{ChannelTransport, ScriptedTransport, chunks};

    fn body(parts: &[&str]) -> ByteStream {
        Box::pin(stream::iter(
            parts
                .iter()
                .map(|part| Ok(bytes::Bytes::from(part.as_bytes().to_vec())))
                .collect::<Vec<_>>(),
        ))
    }

    async fn collect(stream: impl futures::Stream<Item = StreamItem>) -> Vec<StreamItem> {
        stream.collect().await
    }

    fn request() -> PlanRequest {
        PlanRequest::new(
            "hi",
            ThreadId::from_string("t-1"),
            crate::request::sample_config(),
        )
    }

    #[tokio::test]
    async fn end_to_end_example_yields_two_statuses_then_final() {
        let wire = "data: parsing\n\ndata: planning\n\ndata: [FINAL_OUTPUT] [[\"User\",\"Query\",\"hi\"],[\"agent\",\"Greeting\",\"hello\"]]\n\n";
        let items = collect(frame_events(body(&[wire]))).await;
        assert_eq!(
            items,
            vec![
                Ok(Event::status("parsing")),
                Ok(Event::status("planning")),
                Ok(Event::FinalResult {
                    payload: vec![
                        Message::user("hi"),
                        Message::agent("agent", AgentKind::Greeting, serde_json::json!("hello")),
                    ]
                    .into(),
                }),
            ]
        );
    }

    #[tokio::test]
    async fn nothing_is_yielded_after_final_result() {
        let items = collect(frame_events(body(&[
            "data: a\n\ndata: [FINAL_OUTPUT] []\n\ndata: late\n\n",
            "data: [FINAL_OUTPUT] [[\"User\",\"Query\",\"again\"]]\n\n",
        ])))
        .await;
        assert_eq!(
            items,
            vec![
                Ok(Event::status("a")),
                Ok(Event::FinalResult {
                    payload: Transcript::new()
                }),
            ]
        );
    }

    #[tokio::test]
    async fn final_result_ends_stream_without_waiting_for_eof() {
        let head = stream::iter(vec![Ok(bytes::Bytes::from_static(
            b"data: [FINAL_OUTPUT] []\n\n",
        ))]);
        let bytes: ByteStream = Box::pin(head.chain(stream::pending()));
        let mut events = Box::pin(frame_events(bytes));
        assert!(matches!(events.next().await, Some(Ok(Event::FinalResult { .. }))));
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn malformed_final_result_is_skipped_and_stream_continues() {
        let items = collect(frame_events(body(&[
            "data: [FINAL_OUTPUT] {oops\n\ndata: still going\n\n",
        ])))
        .await;
        assert_eq!(items, vec![Ok(Event::status("still going"))]);
    }

    #[tokio::test]
    async fn transport_error_is_terminal() {
        let bytes: ByteStream = Box::pin(stream::iter(vec![
            Ok(bytes::Bytes::from_static(b"data: a\n\ndata: parti")),
            Err(StreamFailure::transport("connection reset")),
            Ok(bytes::Bytes::from_static(b"al\n\n")),
        ]));
        let items = collect(frame_events(bytes)).await;
        assert_eq!(
            items,
            vec![
                Ok(Event::status("a")),
                Err(StreamFailure::transport("connection reset")),
            ]
        );
    }

    #[tokio::test]
    async fn unterminated_tail_is_dropped_at_eof() {
        let items = collect(frame_events(body(&["data: a\n\ndata: never finished"]))).await;
        assert_eq!(items, vec![Ok(Event::status("a"))]);
    }

    #[tokio::test]
    async fn session_delivers_events_in_frame_order() {
        let transport = Arc::new(ScriptedTransport::new(chunks(&[
            "data: one\n\nda",
            "ta: two\n\n",
            "data: [FINAL_OUTPUT] []\n\n",
        ])));
        let stream = spawn_session(transport.clone(), request(), 4);
        assert_eq!(stream.thread_id().as_str(), "t-1");
        assert_eq!(stream.finish().await, SessionOutcome::Completed(Transcript::new()));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn cancellation_after_two_of_five_frames_yields_exactly_two() {
        let (transport, feed) = ChannelTransport::new();
        let mut stream = spawn_session(Arc::new(transport), request(), 16);

        feed.send(bytes::Bytes::from_static(b"data: 1\n\n")).expect("feed");
        feed.send(bytes::Bytes::from_static(b"data: 2\n\ndata: 3")).expect("feed");
        assert_eq!(stream.next_event().await, Some(Ok(Event::status("1"))));
        assert_eq!(stream.next_event().await, Some(Ok(Event::status("2"))));

        stream.abort_handle().abort();
        let _ = feed.send(bytes::Bytes::from_static(b"\n\ndata: 4\n\ndata: 5\n\n"));

        assert_eq!(stream.next_event().await, Some(Err(StreamFailure::Cancelled)));
        assert_eq!(stream.next_event().await, None);
    }

    #[tokio::test]
    async fn abort_unblocks_a_pending_read() {
        let (transport, _feed) = ChannelTransport::new();
        let mut stream = spawn_session(Arc::new(transport), request(), 4);
        let abort = stream.abort_handle();

        let waiter = tokio::spawn(async move { stream.next_event().await });
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        abort.abort();

        let item = tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .expect("abort must unblock the reader")
            .expect("join");
        assert_eq!(item, Some(Err(StreamFailure::Cancelled)));
    }

    #[tokio::test]
    async fn abort_releases_body_while_consumer_is_behind() {
        let (transport, feed) = ChannelTransport::new();
        let stream = spawn_session(Arc::new(transport), request(), 1);

        for frame in ["data: 1\n\n", "data: 2\n\n", "data: 3\n\n"] {
            feed.send(bytes::Bytes::from(frame)).expect("feed");
        }
        // One event fills the channel; the task is now parked on the next send.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!feed.is_closed());

        stream.abort_handle().abort();
        tokio::time::timeout(std::time::Duration::from_secs(1), feed.closed())
            .await
            .expect("abort must drop the response body");
        drop(stream);
    }

    #[tokio::test]
    async fn each_session_gets_its_own_id() {
        let transport = Arc::new(ScriptedTransport::new(chunks(&["data: [FINAL_OUTPUT] []\n\n"])));
        let first = spawn_session(transport.clone(), request(), 4);
        let second = spawn_session(transport, request(), 4);
        assert_eq!(first.thread_id(), second.thread_id());
        assert_ne!(first.session_id(), second.session_id());
    }

    #[tokio::test]
    async fn open_failure_is_terminal_item() {
        let transport = Arc::new(ScriptedTransport::failing(StreamFailure::Status {
            status: 503,
            body: "busy".into(),
        }));
        let stream = spawn_session(transport, request(), 4);
        assert_eq!(
            stream.finish().await,
            SessionOutcome::Failed(StreamFailure::Status {
                status: 503,
                body: "busy".into()
            })
        );
    }

    #[tokio::test]
    async fn eof_without_final_is_exhausted() {
        let transport = Arc::new(ScriptedTransport::new(chunks(&["data: only status\n\n"])));
        let mut stream = spawn_session(transport, request(), 4);
        assert_eq!(stream.next_event().await, Some(Ok(Event::status("only status"))));
        assert_eq!(stream.next_event().await, None);
        assert_eq!(stream.finish().await, SessionOutcome::Exhausted);
    }
}
