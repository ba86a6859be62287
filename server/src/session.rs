use crate::eviction::{EvictionGeneration, EvictionHandle};
use system::{SessionId, SessionSnapshot};

/// Registry record for one board. Members are tracked by the connection groups, not here.
#[derive(Debug, Default)]
pub struct Session {
    /// Can drop below zero when a leave has no matching join.
    pub participant_count: i64,
    pub pending_eviction: Option<EvictionHandle>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.participant_count <= 0
    }

    pub fn pending_generation(&self) -> Option<EvictionGeneration> {
        self.pending_eviction.as_ref().map(EvictionHandle::generation)
    }

    pub fn snapshot(&self, session_id: &SessionId) -> SessionSnapshot {
        SessionSnapshot {
            session_id: session_id.clone(),
            participant_count: self.participant_count,
            draining: self.pending_eviction.is_some(),
        }
    }
}
