//! Common imports for typical client usage.
pub use crate::{
    AbortHandle, Action, AgentKind, AgentPayload, ClientConfig, ClientError, Conversation,
    ConversationState, Event, EventStream, Message, PlanRequest, PlannerClient, PlannerConfig,
    SessionContext, SessionOutcome, StreamFailure, ThreadId, Transcript,
};
