use tracing::{debug, info, warn};

use crate::client::PlannerClient;
use crate::conversation::{Action, ConversationState};
use crate::errors::{ClientError, StreamFailure};
use crate::request::{PlanRequest, PlannerConfig};
use crate::session::SessionContext;
use crate::stream::{AbortHandle, EventStream, SessionOutcome};

/// The session whose events currently own the state.
struct ActiveSession {
    id: uuid::Uuid,
    abort: AbortHandle,
}

/// Top-level controller for one conversation.
///
/// Owns the session context (thread id), the planner settings, the current
/// state, and the active session. At most one session is active: submitting
/// again cancels the previous one.
pub struct Conversation {
    client: PlannerClient,
    context: SessionContext,
    planner: Option<PlannerConfig>,
    state: ConversationState,
    active: Option<ActiveSession>,
}

impl Conversation {
    pub fn new(client: PlannerClient) -> Self {
        Self {
            client,
            context: SessionContext::new(),
            planner: None,
            state: ConversationState::new(),
            active: None,
        }
    }

    /// Uses an existing context, for example to resume a saved thread.
    pub fn with_context(mut self, context: SessionContext) -> Self {
        self.context = context;
        self
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// Stores the planner settings after validating them.
    pub fn set_planner_config(&mut self, config: PlannerConfig) -> Result<(), ClientError> {
        config.validate()?;
        self.planner = Some(config);
        Ok(())
    }

    /// Returns `true` once planner settings are present.
    pub fn is_ready(&self) -> bool {
        self.planner.is_some()
    }

    /// Runs the reducer. Returns whether the state changed.
    pub fn apply(&mut self, action: Action) -> bool {
        match self.state.apply(action) {
            Some(next) => {
                self.state = next;
                true
            }
            None => false,
        }
    }

    /// Submits a query and opens its session.
    ///
    /// The user turn is appended before the request starts. Any session still
    /// running for this conversation is cancelled first.
    pub fn submit(&mut self, query: impl Into<String>) -> Result<EventStream, ClientError> {
        let query = query.into();
        if query.trim().is_empty() {
            return Err(ClientError::validation("query must not be empty"));
        }
        let Some(planner) = self.planner.clone() else {
            return Err(ClientError::validation(
                "planner settings are required before submitting",
            ));
        };

        self.cancel();
        self.apply(Action::Submit {
            query: query.clone(),
        });
        let thread_id = self.context.get_or_create_thread_id().clone();
        let request = PlanRequest::new(query, thread_id, planner);

        match self.client.open(request) {
            Ok(stream) => {
                info!(thread_id = %stream.thread_id(), "query submitted");
                self.active = Some(ActiveSession {
                    id: stream.session_id(),
                    abort: stream.abort_handle(),
                });
                self.apply(Action::StreamOpened);
                Ok(stream)
            }
            Err(err) => {
                self.apply(Action::SessionEnded);
                Err(err)
            }
        }
    }

    /// Cancels the active session, if any.
    pub fn cancel(&mut self) {
        if let Some(active) = &self.active {
            debug!(session_id = %active.id, "cancelling active planner session");
            active.abort.abort();
        }
    }

    /// Consumes `stream`, reducing each event into the state.
    ///
    /// `on_change` runs after every state change, including the final
    /// status-clearing step when the session ends. A stream that was
    /// replaced by a later submission is drained without touching the state.
    pub async fn drive<F>(&mut self, mut stream: EventStream, mut on_change: F) -> SessionOutcome
    where
        F: FnMut(&ConversationState),
    {
        let is_active = self
            .active
            .as_ref()
            .is_some_and(|active| active.id == stream.session_id());
        if !is_active {
            debug!(session_id = %stream.session_id(), "draining superseded planner session");
            return stream.finish().await;
        }

        let mut outcome = SessionOutcome::Exhausted;
        while let Some(item) = stream.next_event().await {
            outcome.observe(&item);
            match item {
                Ok(event) => {
                    if self.apply(Action::Event(event)) {
                        on_change(&self.state);
                    }
                }
                Err(StreamFailure::Cancelled) => debug!("planner session cancelled"),
                Err(failure) => warn!(error = %failure, "planner session failed"),
            }
        }
        self.active = None;
        if self.apply(Action::SessionEnded) {
            on_change(&self.state);
        }
        outcome
    }
}
