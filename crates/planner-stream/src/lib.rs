//! Streaming client for the course-planning assistant backend.
//!
//! A planning request is answered with one long-lived `text/event-stream`
//! response. This crate splits that byte stream into frames, classifies each
//! frame as a progress `Status` or the terminal `FinalResult` transcript, and
//! folds the events into a render-ready [`ConversationState`].
//!
//! # Usage
//!
//! ```no_run
//! use planner_stream::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), ClientError> {
//! let client = PlannerClient::new(ClientConfig::new("http://localhost:8000/get_response"))?;
//! let mut conversation = Conversation::new(client);
//! conversation.set_planner_config(
//!     PlannerConfig::new("Khoury College of Computer Sciences", "Computer Science")
//!         .credits_per_semester(8, 12)
//!         .max_credits(32)
//!         .core_course("CS5010")
//!         .max_number_of_plans(2),
//! )?;
//!
//! let stream = conversation.submit("Plan my degree around machine learning")?;
//! let outcome = conversation
//!     .drive(stream, |state| {
//!         if let Some(status) = state.current_status() {
//!             println!("… {status}");
//!         }
//!     })
//!     .await;
//! println!("{outcome:?}: {} messages", conversation.state().transcript().len());
//! # Ok(())
//! # }
//! ```

/// Client entry point for opening sessions.
pub mod client;
/// Client configuration.
pub mod config;
/// Render-ready state and its reducer.
pub mod conversation;
/// Conversation controller tying the client, context, and reducer together.
pub mod controller;
/// Public error types.
pub mod errors;
/// Frame classification into events.
pub mod event;
/// Incremental UTF-8 decoding and frame splitting.
pub mod frame;
/// Transcript messages and their wire encoding.
pub mod message;
/// Logging setup.
pub mod observability;
/// Typed views over agent payloads.
pub mod payload;
/// Common imports for typical usage.
pub mod prelude;
/// Request body and planner settings.
pub mod request;
/// Thread ids and the per-conversation session context.
pub mod session;
/// Per-request event stream, cancellation, and session outcome.
pub mod stream;
/// Transport abstraction and the HTTP implementation.
pub mod transport;

#[cfg(test)]
mod testing;

pub use client::PlannerClient;
pub use config::ClientConfig;
pub use controller::Conversation;
pub use conversation::{Action, ConversationState, Phase};
pub use errors::{ClientError, FrameDecodeError, StreamFailure};
pub use event::{Event, classify, classify_frame};
pub use frame::{Frame, FrameSplitter, Utf8StreamDecoder};
pub use message::{AgentKind, AgentTurn, Message, Transcript};
pub use payload::AgentPayload;
pub use request::{PlanRequest, PlannerConfig};
pub use session::{SessionContext, ThreadId};
pub use stream::{AbortHandle, EventStream, SessionOutcome, StreamItem, frame_events};
pub use transport::{ByteStream, HttpTransport, Transport};
