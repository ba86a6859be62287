use std::num::Wrapping;
use std::time::Duration;

use system::{ClientMessage, ConnectionId, SessionId, SessionSnapshot};
use tokio::sync::mpsc::{channel, Sender};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::connection::ConnectionEvent;
use crate::connection_groups::{ConnectionGroups, ConnectionTx, GroupMembership};
use crate::eviction::EvictionDue;
use crate::router::relay;
use crate::session_registry::SessionRegistry;

pub type ServerTx = Sender<ServerCommand>;

#[derive(Debug)]
pub enum ServerCommand {
    Connect {
        tx: ConnectionTx,
    },
    Disconnect {
        from: ConnectionId,
    },
    ClientMessage {
        from: ConnectionId,
        message: ClientMessage,
    },
    GetSession {
        session_id: SessionId,
        tx: oneshot::Sender<Option<SessionSnapshot>>,
    },
    ListSessions {
        tx: oneshot::Sender<Vec<SessionSnapshot>>,
    },
}

#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub grace_period: Duration,
    pub command_buffer: usize,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_secs(60),
            command_buffer: 64,
        }
    }
}

struct Server {
    registry: SessionRegistry,
    connections: ConnectionGroups,
    connection_id_source: Wrapping<ConnectionId>,
}

impl Server {
    fn new(registry: SessionRegistry) -> Self {
        Self {
            registry,
            connections: ConnectionGroups::new(),
            connection_id_source: Wrapping(0),
        }
    }

    fn handle_command(&mut self, command: ServerCommand) {
        match command {
            ServerCommand::Connect { tx } => {
                let connection_id = self.new_connection_id();
                self.connections.insert(connection_id, tx);
                log::info!("Connection {} opened", connection_id);
                self.connections
                    .send(connection_id, ConnectionEvent::Connected { connection_id });
            }
            ServerCommand::Disconnect { from } => {
                self.leave_session(from);
                if self.connections.remove(from).is_some() {
                    log::info!("Connection {} closed", from);
                }
            }
            ServerCommand::ClientMessage { from, message } => {
                self.handle_client_message(from, message)
            }
            ServerCommand::GetSession { session_id, tx } => {
                let _ = tx.send(self.registry.snapshot(&session_id));
            }
            ServerCommand::ListSessions { tx } => {
                let _ = tx.send(self.registry.snapshots());
            }
        }
    }

    fn handle_client_message(&mut self, from: ConnectionId, message: ClientMessage) {
        match message {
            ClientMessage::JoinSession(session_id) => self.join_session(from, session_id),
            message => {
                if let Some(relayed) = message.into_relayed() {
                    relay(&self.connections, from, relayed);
                }
            }
        }
    }

    fn join_session(&mut self, from: ConnectionId, session_id: SessionId) {
        if !self.connections.contains(from) {
            log::warn!("Unknown connection {} tried to join {}", from, session_id);
            return;
        }
        match self.connections.group_of(from) {
            Some(current) if *current == session_id => {
                log::debug!("Connection {} is already in session {}", from, session_id);
                return;
            }
            Some(_) => self.leave_session(from),
            None => (),
        }

        self.connections.add_to_group(from, &session_id);
        let participants = self.registry.join(&session_id);
        log::info!(
            "User joined session {}. Total users: {}",
            session_id,
            participants
        );
    }

    fn leave_session(&mut self, connection_id: ConnectionId) {
        if let Some(session_id) = self.connections.remove_from_group(connection_id) {
            if let Some(participants) = self.registry.leave(&session_id) {
                log::info!(
                    "User left session {}. Total users: {}",
                    session_id,
                    participants
                );
            }
        }
    }

    fn handle_eviction(&mut self, due: EvictionDue) {
        self.registry.evict_if_due(&due);
    }

    fn shutdown(&mut self) {
        let ids: Vec<_> = self.connections.ids().collect();
        for connection_id in ids {
            self.connections
                .send(connection_id, ConnectionEvent::Disconnected);
            self.connections.remove(connection_id);
        }
        self.registry.shutdown();
    }

    fn new_connection_id(&mut self) -> ConnectionId {
        loop {
            self.connection_id_source += Wrapping(1);
            let connection_id = self.connection_id_source.0;
            if !self.connections.contains(connection_id) {
                return connection_id;
            }
        }
    }
}

/// Queues `command` without blocking the caller, waiting for room if the channel is full.
///
/// Used for commands that must not be dropped under load, such as a disconnect.
pub fn send_detached(srv_tx: &ServerTx, command: ServerCommand) -> JoinHandle<()> {
    let srv_tx = srv_tx.clone();
    tokio::spawn(async move {
        if let Err(err) = srv_tx.send(command).await {
            log::warn!("Server is gone, dropping {:?}", err.0);
        }
    })
}

/// Spawns the task owning all relay state. It stops once every `ServerTx` is dropped.
pub fn spawn_server(options: ServerOptions) -> ServerTx {
    let (srv_tx, mut srv_rx) = channel::<ServerCommand>(options.command_buffer);

    tokio::spawn(async move {
        let (registry, mut eviction_rx) = SessionRegistry::init(options.grace_period);
        let mut server = Box::new(Server::new(registry));

        loop {
            tokio::select! {
                biased;
                Some(due) = eviction_rx.recv() => server.handle_eviction(due),
                command = srv_rx.recv() => match command {
                    Some(command) => server.handle_command(command),
                    None => break,
                },
            }
        }

        server.shutdown();
    });

    srv_tx
}
