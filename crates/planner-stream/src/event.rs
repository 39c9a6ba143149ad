use tracing::error;

use crate::errors::FrameDecodeError;
use crate::frame::Frame;
use crate::message::Transcript;

/// Prefix marking a frame that carries payload.
pub const DATA_PREFIX: &str = "data:";
/// Marker that turns a data payload into the terminal transcript.
pub const FINAL_OUTPUT_MARKER: &str = "[FINAL_OUTPUT]";

/// Classified application-level event derived from one frame.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Informational progress label. Replaces the previous one.
    Status { text: String },
    /// Full transcript for the request. At most one per session, always last.
    FinalResult { payload: Transcript },
}

impl Event {
    pub fn status(text: impl Into<String>) -> Self {
        Self::Status { text: text.into() }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, Self::FinalResult { .. })
    }
}

/// Classifies one frame.
///
/// Returns `Ok(None)` for frames without a `data:` prefix (comments,
/// keep-alives, blank frames).
pub fn classify_frame(frame: &Frame) -> Result<Option<Event>, FrameDecodeError> {
    let Some(rest) = frame.as_str().trim().strip_prefix(DATA_PREFIX) else {
        return Ok(None);
    };
    let payload_text = rest.trim();

    if let Some(body) = payload_text.strip_prefix(FINAL_OUTPUT_MARKER) {
        let payload = Transcript::from_json(body.trim()).map_err(|e| {
            FrameDecodeError::MalformedFinalResult {
                reason: e.to_string(),
            }
        })?;
        return Ok(Some(Event::FinalResult { payload }));
    }

    Ok(Some(Event::status(payload_text)))
}

/// Classifies one frame, logging and dropping frames that fail to decode.
pub fn classify(frame: &Frame) -> Option<Event> {
    match classify_frame(frame) {
        Ok(event) => event,
        Err(err) => {
            error!(error = %err, frame_len = frame.as_str().len(), "dropping undecodable frame");
            None
        }
    }
}
