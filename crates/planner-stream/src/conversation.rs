//! Render-ready conversation state and the reducer that advances it.
//!
//! State values are immutable: [`ConversationState::apply`] returns the next
//! state, or `None` when the action changes nothing. Callers can skip a
//! re-render on `None`.

use crate::event::Event;
use crate::message::{Message, Transcript};

/// Request lifecycle as seen by the conversation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    /// Query appended, session not yet streaming.
    Submitting,
    Streaming,
}

/// Inputs to the reducer.
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    /// The user edited the pending query text.
    EditDraft(String),
    /// The user submitted a query.
    Submit { query: String },
    /// The session for the last submission is streaming.
    StreamOpened,
    /// An event arrived from the active session.
    Event(Event),
    /// The active session is over, whatever the reason.
    SessionEnded,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConversationState {
    transcript: Transcript,
    current_status: Option<String>,
    draft: String,
    phase: Phase,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from a previously rendered transcript.
    pub fn with_transcript(transcript: Transcript) -> Self {
        Self {
            transcript,
            ..Self::default()
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Latest progress label, if a session is reporting one.
    pub fn current_status(&self) -> Option<&str> {
        self.current_status.as_deref()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle
    }

    /// Returns the state after `action`, or `None` if nothing changes.
    pub fn apply(&self, action: Action) -> Option<Self> {
        match action {
            Action::EditDraft(text) => (text != self.draft).then(|| Self {
                draft: text,
                ..self.clone()
            }),
            Action::Submit { query } => {
                if query.trim().is_empty() {
                    return None;
                }
                let mut next = self.clone();
                next.transcript.push(Message::user(query));
                next.draft.clear();
                next.current_status = None;
                next.phase = Phase::Submitting;
                Some(next)
            }
            Action::StreamOpened => (self.phase == Phase::Submitting).then(|| Self {
                phase: Phase::Streaming,
                ..self.clone()
            }),
            Action::Event(event) => self.apply_event(event),
            Action::SessionEnded => {
                if self.phase == Phase::Idle && self.current_status.is_none() {
                    return None;
                }
                Some(Self {
                    current_status: None,
                    phase: Phase::Idle,
                    ..self.clone()
                })
            }
        }
    }

    fn apply_event(&self, event: Event) -> Option<Self> {
        // Events only belong to an in-flight request; anything else is stale.
        if self.phase == Phase::Idle {
            return None;
        }
        match event {
            Event::Status { text } => {
                if self.current_status.as_deref() == Some(text.as_str()) {
                    return None;
                }
                Some(Self {
                    current_status: Some(text),
                    phase: Phase::Streaming,
                    ..self.clone()
                })
            }
            Event::FinalResult { payload } => Some(Self {
                transcript: payload,
                current_status: None,
                draft: self.draft.clone(),
                phase: Phase::Idle,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::AgentKind;

    fn submitted(query: &str) -> ConversationState {
        ConversationState::new()
            .apply(Action::Submit {
                query: query.into(),
            })
            .and_then(|s| s.apply(Action::StreamOpened))
            .expect("streaming state")
    }

    #[test]
    fn submit_appends_user_turn_and_clears_draft() {
        let state = ConversationState::new()
            .apply(Action::EditDraft("hi".into()))
            .expect("draft");
        assert_eq!(state.draft(), "hi");

        let state = state
            .apply(Action::Submit { query: "hi".into() })
            .expect("submit");
        assert_eq!(state.transcript().messages(), &[Message::user("hi")]);
        assert_eq!(state.draft(), "");
        assert_eq!(state.phase(), Phase::Submitting);
    }

    #[test]
    fn blank_submit_is_no_change() {
        assert_eq!(
            ConversationState::new().apply(Action::Submit { query: " \n".into() }),
            None
        );
    }

    #[test]
    fn repeated_identical_status_changes_state_once() {
        let state = submitted("hi");
        let after_first = state
            .apply(Action::Event(Event::status("x")))
            .expect("first status changes state");
        assert_eq!(after_first.current_status(), Some("x"));
        assert_eq!(after_first.apply(Action::Event(Event::status("x"))), None);

        let after_other = after_first
            .apply(Action::Event(Event::status("y")))
            .expect("different status changes state");
        assert_eq!(after_other.current_status(), Some("y"));
    }

    #[test]
    fn final_result_replaces_transcript_instead_of_merging() {
        let state = submitted("hi")
            .apply(Action::Event(Event::status("planning")))
            .expect("status");
        let payload: Transcript = vec![
            Message::user("hi"),
            Message::agent("AI", AgentKind::Greeting, serde_json::json!("hello")),
        ]
        .into();

        let state = state
            .apply(Action::Event(Event::FinalResult {
                payload: payload.clone(),
            }))
            .expect("final");
        assert_eq!(state.transcript(), &payload);
        assert_eq!(state.current_status(), None);
        assert!(state.is_idle());
    }

    #[test]
    fn session_end_without_final_clears_status_and_keeps_transcript() {
        let state = submitted("hi")
            .apply(Action::Event(Event::status("Searching the Database")))
            .expect("status");
        let ended = state.apply(Action::SessionEnded).expect("ended");
        assert_eq!(ended.current_status(), None);
        assert!(ended.is_idle());
        assert_eq!(ended.transcript().messages(), &[Message::user("hi")]);
        assert_eq!(ended.apply(Action::SessionEnded), None);
    }

    #[test]
    fn events_while_idle_are_ignored() {
        let idle = ConversationState::with_transcript(vec![Message::user("old")].into());
        assert_eq!(idle.apply(Action::Event(Event::status("late"))), None);
        assert_eq!(
            idle.apply(Action::Event(Event::FinalResult {
                payload: Transcript::new()
            })),
            None
        );
    }

    #[test]
    fn status_after_final_result_cannot_resurrect_spinner() {
        let done = submitted("hi")
            .apply(Action::Event(Event::FinalResult {
                payload: vec![Message::user("hi")].into(),
            }))
            .expect("final");
        assert_eq!(done.apply(Action::Event(Event::status("stale"))), None);
        assert_eq!(done.current_status(), None);
    }
}
