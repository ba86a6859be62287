use std::collections::{HashMap, HashSet};

use system::{ConnectionId, ServerMessage, SessionId};
use tokio::sync::mpsc::error::TrySendError;

use crate::connection::ConnectionEvent;

pub type ConnectionTx = tokio::sync::mpsc::Sender<ConnectionEvent>;

/// Room membership used for fan-out.
pub trait GroupMembership {
    fn add_to_group(&mut self, connection_id: ConnectionId, group: &SessionId) -> bool;

    /// Returns the group the connection was removed from.
    fn remove_from_group(&mut self, connection_id: ConnectionId) -> Option<SessionId>;

    fn group_of(&self, connection_id: ConnectionId) -> Option<&SessionId>;

    /// Returns how many connections accepted the message.
    fn broadcast_to_group(
        &self,
        group: &SessionId,
        excluding: Option<ConnectionId>,
        message: &ServerMessage,
    ) -> usize;
}

struct ConnectionEntry {
    tx: ConnectionTx,
    group: Option<SessionId>,
}

/// Outbound channel of every live connection, plus which group each one is in.
#[derive(Default)]
pub struct ConnectionGroups {
    connections: HashMap<ConnectionId, ConnectionEntry>,
    groups: HashMap<SessionId, HashSet<ConnectionId>>,
}

impl ConnectionGroups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, connection_id: ConnectionId, tx: ConnectionTx) {
        self.connections
            .insert(connection_id, ConnectionEntry { tx, group: None });
    }

    pub fn contains(&self, connection_id: ConnectionId) -> bool {
        self.connections.contains_key(&connection_id)
    }

    pub fn ids(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.connections.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Never waits. A full or closed buffer loses this event only.
    pub fn send(&self, to: ConnectionId, event: ConnectionEvent) -> bool {
        match self.connections.get(&to) {
            Some(entry) => deliver(to, &entry.tx, event),
            None => {
                log::warn!("Cannot send to unknown connection {}", to);
                false
            }
        }
    }

    /// Forgets the connection and its group membership.
    pub fn remove(&mut self, connection_id: ConnectionId) -> Option<ConnectionTx> {
        self.remove_from_group(connection_id);
        self.connections.remove(&connection_id).map(|entry| entry.tx)
    }

    pub fn members(&self, group: &SessionId) -> usize {
        self.groups.get(group).map_or(0, HashSet::len)
    }
}

impl GroupMembership for ConnectionGroups {
    fn add_to_group(&mut self, connection_id: ConnectionId, group: &SessionId) -> bool {
        let previous = match self.connections.get_mut(&connection_id) {
            Some(entry) => entry.group.replace(group.clone()),
            None => return false,
        };
        if let Some(previous) = previous {
            leave_group(&mut self.groups, &previous, connection_id);
        }
        self.groups
            .entry(group.clone())
            .or_default()
            .insert(connection_id);
        true
    }

    fn remove_from_group(&mut self, connection_id: ConnectionId) -> Option<SessionId> {
        let group = self
            .connections
            .get_mut(&connection_id)
            .and_then(|entry| entry.group.take())?;
        leave_group(&mut self.groups, &group, connection_id);
        Some(group)
    }

    fn group_of(&self, connection_id: ConnectionId) -> Option<&SessionId> {
        self.connections
            .get(&connection_id)
            .and_then(|entry| entry.group.as_ref())
    }

    fn broadcast_to_group(
        &self,
        group: &SessionId,
        excluding: Option<ConnectionId>,
        message: &ServerMessage,
    ) -> usize {
        let members = match self.groups.get(group) {
            Some(members) => members,
            None => return 0,
        };
        let mut delivered = 0;
        for &id in members.iter().filter(|&&id| Some(id) != excluding) {
            if let Some(entry) = self.connections.get(&id) {
                if deliver(id, &entry.tx, ConnectionEvent::Relay(message.clone())) {
                    delivered += 1;
                }
            }
        }
        delivered
    }
}

fn leave_group(
    groups: &mut HashMap<SessionId, HashSet<ConnectionId>>,
    group: &SessionId,
    connection_id: ConnectionId,
) {
    if let Some(members) = groups.get_mut(group) {
        members.remove(&connection_id);
        if members.is_empty() {
            groups.remove(group);
        }
    }
}

fn deliver(to: ConnectionId, tx: &ConnectionTx, event: ConnectionEvent) -> bool {
    match tx.try_send(event) {
        Ok(()) => true,
        Err(TrySendError::Full(event)) => {
            log::warn!("Connection {} is lagging, dropped {:?}", to, event);
            false
        }
        Err(TrySendError::Closed(_)) => {
            log::debug!("Connection {} is already closed", to);
            false
        }
    }
}
