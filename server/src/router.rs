use system::{ConnectionId, ServerMessage};

use crate::connection_groups::GroupMembership;

/// Relays `message` to everyone else in the sender's group.
///
/// A sender outside any group has nowhere to relay to and its event is dropped.
pub fn relay<G: GroupMembership>(groups: &G, from: ConnectionId, message: ServerMessage) -> usize {
    match groups.group_of(from) {
        Some(session_id) => {
            let delivered = groups.broadcast_to_group(session_id, Some(from), &message);
            log::debug!(
                "Relayed {:?} from {} to {} peers in {}",
                message,
                from,
                delivered,
                session_id
            );
            delivered
        }
        None => {
            log::debug!(
                "Dropping {:?} from connection {} which has not joined a session",
                message,
                from
            );
            0
        }
    }
}
