use std::collections::HashMap;
use std::time::Duration;

use system::{SessionId, SessionSnapshot};

use crate::eviction::{EvictionDue, EvictionRx, EvictionScheduler};
use crate::session::Session;

/// Owns every session record and decides when one is created, drained or removed.
///
/// Not synchronized: the server task is its only owner, which serializes every mutation.
pub struct SessionRegistry {
    sessions: HashMap<SessionId, Session>,
    scheduler: EvictionScheduler,
}

impl SessionRegistry {
    /// Returns the registry with the receiving end of its eviction timers.
    pub fn init(grace_period: Duration) -> (Self, EvictionRx) {
        let (scheduler, eviction_rx) = EvictionScheduler::new(grace_period);
        (
            Self {
                sessions: HashMap::new(),
                scheduler,
            },
            eviction_rx,
        )
    }

    pub fn ensure_session(&mut self, session_id: &SessionId) -> &mut Session {
        self.sessions
            .entry(session_id.clone())
            .or_insert_with(|| created(session_id))
    }

    /// Returns the new participant count.
    ///
    /// A join that leaves the count at or below zero keeps the session draining.
    pub fn join(&mut self, session_id: &SessionId) -> i64 {
        let session = self
            .sessions
            .entry(session_id.clone())
            .or_insert_with(|| created(session_id));
        session.participant_count += 1;
        if !session.is_empty() {
            if let Some(eviction) = session.pending_eviction.take() {
                log::info!("Session {} eviction cancelled", session_id);
                eviction.cancel();
            }
        } else if session.pending_eviction.is_none() {
            session.pending_eviction = Some(self.scheduler.arm(session_id));
        }
        session.participant_count
    }

    /// Returns the new participant count, or `None` for an unknown session.
    pub fn leave(&mut self, session_id: &SessionId) -> Option<i64> {
        let session = self.sessions.get_mut(session_id)?;
        session.participant_count -= 1;
        if session.is_empty() {
            let eviction = self.scheduler.arm(session_id);
            log::info!(
                "Session {} is empty, eviction armed for {:?}",
                session_id,
                self.scheduler.grace_period()
            );
            if let Some(previous) = session.pending_eviction.replace(eviction) {
                previous.cancel();
            }
        }
        Some(session.participant_count)
    }

    /// Removes the session if `due` is its current timer and it is still empty.
    pub fn evict_if_due(&mut self, due: &EvictionDue) -> bool {
        let is_current = self.sessions.get(&due.session_id).map_or(false, |session| {
            session.is_empty() && session.pending_generation() == Some(due.generation)
        });
        if is_current {
            self.sessions.remove(&due.session_id);
            log::info!("Session {} removed due to inactivity", due.session_id);
        } else {
            log::debug!(
                "Ignoring stale eviction {} for session {}",
                due.generation,
                due.session_id
            );
        }
        is_current
    }

    pub fn get(&self, session_id: &SessionId) -> Option<&Session> {
        self.sessions.get(session_id)
    }

    pub fn contains(&self, session_id: &SessionId) -> bool {
        self.sessions.contains_key(session_id)
    }

    pub fn participant_count(&self, session_id: &SessionId) -> Option<i64> {
        self.get(session_id).map(|s| s.participant_count)
    }

    pub fn snapshot(&self, session_id: &SessionId) -> Option<SessionSnapshot> {
        self.get(session_id).map(|s| s.snapshot(session_id))
    }

    pub fn snapshots(&self) -> Vec<SessionSnapshot> {
        let mut snapshots: Vec<_> = self
            .sessions
            .iter()
            .map(|(session_id, session)| session.snapshot(session_id))
            .collect();
        snapshots.sort_by(|a, b| a.session_id.cmp(&b.session_id));
        snapshots
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drops every session and cancels their timers.
    pub fn shutdown(&mut self) {
        let pending = self
            .sessions
            .values()
            .filter(|s| s.pending_eviction.is_some())
            .count();
        log::info!(
            "Shutting down registry with {} sessions ({} draining)",
            self.sessions.len(),
            pending
        );
        self.sessions.clear();
    }
}

fn created(session_id: &SessionId) -> Session {
    log::info!("Session {} created", session_id);
    Session::new()
}
