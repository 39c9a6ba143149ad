use std::fmt;

/// Correlation id sent with every request of one conversation.
///
/// Freshly minted ids have the form `<uuid>-<uuid>`.
#[derive(Clone, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ThreadId(String);

impl ThreadId {
    /// Mints a new random id.
    pub fn generate() -> Self {
        Self(format!("{}-{}", uuid::Uuid::new_v4(), uuid::Uuid::new_v4()))
    }

    /// Wraps an existing id, for example one restored from storage.
    pub fn from_string(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-conversation context owning the thread id.
///
/// The id is created lazily on first use and then reused for every later
/// submission made through the same context.
#[derive(Clone, Debug, Default)]
pub struct SessionContext {
    thread_id: Option<ThreadId>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continues an existing conversation.
    pub fn with_thread_id(thread_id: ThreadId) -> Self {
        Self {
            thread_id: Some(thread_id),
        }
    }

    /// Returns the id if one has been created.
    pub fn thread_id(&self) -> Option<&ThreadId> {
        self.thread_id.as_ref()
    }

    /// Returns the id, minting it on first call.
    pub fn get_or_create_thread_id(&mut self) -> &ThreadId {
        self.thread_id.get_or_insert_with(ThreadId::generate)
    }
}
