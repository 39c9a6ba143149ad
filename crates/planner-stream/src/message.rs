use std::fmt;

use serde::de::Deserializer;
use serde::ser::{SerializeSeq as _, Serializer};
use tracing::debug;

use crate::payload::AgentPayload;

/// Role string the backend uses for user turns.
pub const USER_ROLE: &str = "User";
/// Kind string the backend attaches to user turns.
pub const USER_QUERY_KIND: &str = "Query";

/// Closed set of agent turn kinds the client knows how to render.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AgentKind {
    Planning,
    Rescheduling,
    ShortTermPlan,
    Greeting,
    CourseExtractor,
}

impl AgentKind {
    /// Parses the wire name. Unknown kinds return `None`.
    pub fn from_wire(kind: &str) -> Option<Self> {
        match kind {
            "Planning" => Some(Self::Planning),
            "Rescheduling" => Some(Self::Rescheduling),
            "ShortTermPlan" => Some(Self::ShortTermPlan),
            "Greeting" => Some(Self::Greeting),
            "CourseExtractor" => Some(Self::CourseExtractor),
            _ => None,
        }
    }

    /// Returns the wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planning => "Planning",
            Self::Rescheduling => "Rescheduling",
            Self::ShortTermPlan => "ShortTermPlan",
            Self::Greeting => "Greeting",
            Self::CourseExtractor => "CourseExtractor",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One agent-produced entry of the transcript.
#[derive(Clone, Debug, PartialEq)]
pub struct AgentTurn {
    /// Role name the backend used (for example `AI`).
    pub agent: String,
    pub kind: AgentKind,
    /// Opaque payload; see [`AgentTurn::view`] for typed access.
    pub data: serde_json::Value,
}

impl AgentTurn {
    pub fn new(agent: impl Into<String>, kind: AgentKind, data: serde_json::Value) -> Self {
        Self {
            agent: agent.into(),
            kind,
            data,
        }
    }

    /// Decodes the payload into the shape documented for its kind.
    pub fn view(&self) -> AgentPayload {
        AgentPayload::decode(self.kind, &self.data)
    }
}

/// One transcript entry.
#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    UserTurn { text: String },
    AgentTurn(AgentTurn),
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self::UserTurn { text: text.into() }
    }

    pub fn agent(agent: impl Into<String>, kind: AgentKind, data: serde_json::Value) -> Self {
        Self::AgentTurn(AgentTurn::new(agent, kind, data))
    }

    /// Interprets one `[role, kind, data]` wire tuple.
    ///
    /// Entries that are not tuples, and agent entries with an unrecognized
    /// kind, yield `None`.
    pub fn from_wire(entry: &serde_json::Value) -> Option<Self> {
        let tuple = entry.as_array()?;
        let [role, kind, data, ..] = tuple.as_slice() else {
            return None;
        };
        let role = role.as_str()?;
        if role == USER_ROLE {
            let text = match data {
                serde_json::Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            return Some(Self::UserTurn { text });
        }
        let kind = AgentKind::from_wire(kind.as_str()?)?;
        Some(Self::agent(role, kind, data.clone()))
    }

    /// Encodes the message back into its `[role, kind, data]` tuple.
    pub fn to_wire(&self) -> serde_json::Value {
        match self {
            Self::UserTurn { text } => serde_json::json!([USER_ROLE, USER_QUERY_KIND, text]),
            Self::AgentTurn(turn) => {
                serde_json::json!([turn.agent, turn.kind.as_str(), turn.data])
            }
        }
    }
}

/// Ordered conversation history.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Transcript(Vec<Message>);

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the `[FINAL_OUTPUT]` document: a JSON array of wire tuples.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn push(&mut self, message: Message) {
        self.0.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.0.iter()
    }
}

impl From<Vec<Message>> for Transcript {
    fn from(messages: Vec<Message>) -> Self {
        Self(messages)
    }
}

impl IntoIterator for Transcript {
    type Item = Message;
    type IntoIter = std::vec::IntoIter<Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl serde::Serialize for Transcript {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for message in &self.0 {
            seq.serialize_element(&message.to_wire())?;
        }
        seq.end()
    }
}

impl<'de> serde::Deserialize<'de> for Transcript {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = <Vec<serde_json::Value> as serde::Deserialize>::deserialize(deserializer)?;
        let total = entries.len();
        let messages: Vec<Message> = entries.iter().filter_map(Message::from_wire).collect();
        if messages.len() != total {
            debug!(
                kept = messages.len(),
                dropped = total - messages.len(),
                "dropped transcript entries with unrecognized shape or kind"
            );
        }
        Ok(Self(messages))
    }
}
