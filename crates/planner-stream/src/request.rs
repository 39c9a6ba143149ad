use serde::{Deserialize, Serialize};

use crate::errors::ClientError;
use crate::session::ThreadId;

const RESERVED_FIELDS: [&str; 2] = ["query", "thread_id"];

/// Planner constraints collected by the form front end.
///
/// Serialized field names match the backend's request schema.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    pub college: String,
    pub department: String,
    pub min_creds_per_sem: u32,
    pub max_creds_per_sem: u32,
    pub core_course_numbers: Vec<String>,
    pub max_credits: u32,
    pub max_number_of_plans: u32,
    /// Additional opaque fields merged into the request body.
    #[serde(flatten, default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PlannerConfig {
    pub fn new(college: impl Into<String>, department: impl Into<String>) -> Self {
        Self {
            college: college.into(),
            department: department.into(),
            min_creds_per_sem: 0,
            max_creds_per_sem: 0,
            core_course_numbers: Vec::new(),
            max_credits: 0,
            max_number_of_plans: 1,
            extra: serde_json::Map::new(),
        }
    }

    /// Sets the per-semester credit range.
    pub fn credits_per_semester(mut self, min: u32, max: u32) -> Self {
        self.min_creds_per_sem = min;
        self.max_creds_per_sem = max;
        self
    }

    /// Sets the total credits required for the degree.
    pub fn max_credits(mut self, credits: u32) -> Self {
        self.max_credits = credits;
        self
    }

    pub fn core_course(mut self, course_number: impl Into<String>) -> Self {
        self.core_course_numbers.push(course_number.into());
        self
    }

    pub fn max_number_of_plans(mut self, plans: u32) -> Self {
        self.max_number_of_plans = plans;
        self
    }

    /// Adds an opaque field to the request body.
    pub fn field(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Checks that the form is completely and consistently filled.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.college.trim().is_empty() {
            return Err(ClientError::validation("college must not be empty"));
        }
        if self.department.trim().is_empty() {
            return Err(ClientError::validation("department must not be empty"));
        }
        if self.core_course_numbers.is_empty() {
            return Err(ClientError::validation(
                "at least one core course is required",
            ));
        }
        if self
            .core_course_numbers
            .iter()
            .any(|course| course.trim().is_empty())
        {
            return Err(ClientError::validation(
                "core course numbers must not be empty",
            ));
        }
        if self.min_creds_per_sem == 0 || self.max_creds_per_sem == 0 || self.max_credits == 0 {
            return Err(ClientError::validation(
                "credit limits must be greater than 0",
            ));
        }
        if self.min_creds_per_sem > self.max_creds_per_sem {
            return Err(ClientError::validation(format!(
                "min_creds_per_sem ({}) exceeds max_creds_per_sem ({})",
                self.min_creds_per_sem, self.max_creds_per_sem
            )));
        }
        if self.max_creds_per_sem > self.max_credits {
            return Err(ClientError::validation(format!(
                "max_creds_per_sem ({}) exceeds max_credits ({})",
                self.max_creds_per_sem, self.max_credits
            )));
        }
        if self.max_number_of_plans == 0 {
            return Err(ClientError::validation(
                "max_number_of_plans must be at least 1",
            ));
        }
        if let Some(key) = RESERVED_FIELDS
            .iter()
            .find(|key| self.extra.contains_key(**key))
        {
            return Err(ClientError::validation(format!(
                "extra field `{key}` is reserved"
            )));
        }
        Ok(())
    }
}

/// Body of one planning request.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlanRequest {
    pub query: String,
    pub thread_id: ThreadId,
    #[serde(flatten)]
    pub config: PlannerConfig,
}

impl PlanRequest {
    pub fn new(query: impl Into<String>, thread_id: ThreadId, config: PlannerConfig) -> Self {
        Self {
            query: query.into(),
            thread_id,
            config,
        }
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        if self.query.trim().is_empty() {
            return Err(ClientError::validation("query must not be empty"));
        }
        self.config.validate()
    }
}

#[cfg(test)]
pub(crate) fn sample_config() -> PlannerConfig {
    PlannerConfig::new("Khoury College of Computer Sciences", "Computer Science")
        .credits_per_semester(8, 12)
        .max_credits(32)
        .core_course("CS5010")
        .core_course("CS5800")
        .max_number_of_plans(2)
}
