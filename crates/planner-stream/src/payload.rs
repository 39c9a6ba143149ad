//! Typed, read-only views over agent turn payloads.
//!
//! The backend sends these as loosely-typed JSON: numbers sometimes arrive as
//! strings and most fields may be missing. Decoding never fails a transcript;
//! a payload that does not match its documented shape is kept as
//! [`AgentPayload::Raw`].

use std::fmt;

use serde::Deserialize;
use tracing::debug;

use crate::message::AgentKind;

/// A numeric field that may be encoded as a JSON number or a string.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LooseNumber {
    Number(serde_json::Number),
    Text(String),
}

impl fmt::Display for LooseNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Course {
    #[serde(default)]
    pub course_number: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub credit_hours: Option<LooseNumber>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub college: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub prerequisites: Option<serde_json::Value>,
    /// Why the planner picked this course.
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Semester {
    #[serde(default)]
    pub semester: Option<LooseNumber>,
    #[serde(default)]
    pub total_credits: Option<LooseNumber>,
    #[serde(default)]
    pub courses: Vec<Course>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub plan_number: Option<LooseNumber>,
    #[serde(default)]
    pub total_semesters: Option<LooseNumber>,
    #[serde(default)]
    pub total_credits: Option<LooseNumber>,
    #[serde(default)]
    pub semester_schedule: Vec<Semester>,
    #[serde(default)]
    pub reason_behind_planning: Option<String>,
}

/// Next-semester suggestions.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ShortTermPlan {
    #[serde(default)]
    pub suggestions: Vec<Course>,
    #[serde(default, rename = "explaination", alias = "explanation")]
    pub explanation: Option<String>,
}

/// Courses matched from the user's query.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct CourseList {
    #[serde(default)]
    pub matched_courses: Vec<Course>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Deserialize)]
struct ShortTermEnvelope {
    content: ShortTermPlan,
}

#[derive(Deserialize)]
struct CourseListEnvelope {
    response: CourseList,
}

/// Decoded agent payload.
#[derive(Clone, Debug, PartialEq)]
pub enum AgentPayload {
    /// `Planning` and `Rescheduling` turns.
    Plans(Vec<Plan>),
    ShortTermPlan(ShortTermPlan),
    Greeting(String),
    CourseList(CourseList),
    /// Payload did not match the shape documented for its kind.
    Raw(serde_json::Value),
}

impl AgentPayload {
    /// Decodes `data` according to `kind`.
    pub fn decode(kind: AgentKind, data: &serde_json::Value) -> Self {
        let decoded = match kind {
            AgentKind::Planning | AgentKind::Rescheduling => {
                serde_json::from_value::<Vec<Plan>>(data.clone()).map(Self::Plans)
            }
            AgentKind::ShortTermPlan => serde_json::from_value::<ShortTermEnvelope>(data.clone())
                .map(|envelope| Self::ShortTermPlan(envelope.content)),
            AgentKind::CourseExtractor => {
                serde_json::from_value::<CourseListEnvelope>(data.clone())
                    .map(|envelope| Self::CourseList(envelope.response))
            }
            AgentKind::Greeting => Ok(Self::Greeting(match data {
                serde_json::Value::String(text) => text.clone(),
                other => other.to_string(),
            })),
        };
        decoded.unwrap_or_else(|err| {
            debug!(kind = %kind, error = %err, "agent payload does not match its documented shape");
            Self::Raw(data.clone())
        })
    }
}
