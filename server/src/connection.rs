use actix::{Actor, ActorContext, Addr, AsyncContext, Handler, Message, Running, StreamHandler};
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use actix_web_actors::ws::{CloseCode, CloseReason};

use system::{serde_json, ClientMessage, ConnectionId, ServerMessage};

use crate::config::Config;
use crate::error::RelayError;
use crate::server::{send_detached, ServerCommand, ServerTx};

#[derive(Debug)]
pub enum ConnectionEvent {
    Connected { connection_id: ConnectionId },
    Relay(ServerMessage),
    Disconnected,
}

pub fn decode_frame(text: &str) -> Result<ClientMessage, RelayError> {
    Ok(serde_json::from_str(text)?)
}

pub fn encode_frame(message: &ServerMessage) -> Result<String, RelayError> {
    Ok(serde_json::to_string(message)?)
}

#[derive(Message)]
#[rtype(result = "()")]
struct ConnectionActorMessage(ConnectionEvent);

enum ConnectionState {
    /// Waiting for the server to assign an id. Frames are held until then.
    Idle(Vec<ClientMessage>),
    Connected(ConnectionId),
}

struct ConnectionActor {
    state: ConnectionState,
    srv_tx: ServerTx,
    buffer: usize,
}

impl ConnectionActor {
    fn forward(&mut self, message: ClientMessage, ctx: &mut ws::WebsocketContext<Self>) {
        let from = match self.state {
            ConnectionState::Idle(ref mut pending) => {
                pending.push(message);
                return;
            }
            ConnectionState::Connected(from) => from,
        };
        let is_membership = matches!(message, ClientMessage::JoinSession(_));
        let command = ServerCommand::ClientMessage { from, message };

        if is_membership {
            // Membership changes wait for room; later frames queue behind them.
            let srv_tx = self.srv_tx.clone();
            ctx.wait(actix::fut::wrap_future(async move {
                if let Err(err) = srv_tx.send(command).await {
                    log::warn!("Server is gone, dropping join of {}: {}", from, err);
                }
            }));
        } else if let Err(err) = self.srv_tx.try_send(command) {
            log::warn!("Dropping ingress of connection {}: {}", from, err);
        }
    }
}

impl Actor for ConnectionActor {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        let (tx, mut rx) = tokio::sync::mpsc::channel::<ConnectionEvent>(self.buffer);

        if let Err(err) = self.srv_tx.try_send(ServerCommand::Connect { tx }) {
            log::error!("Cannot register connection: {}", err);
            ctx.close(Some(CloseReason {
                code: CloseCode::Again,
                description: None,
            }));
            ctx.stop();
            return;
        }

        let addr: Addr<Self> = ctx.address();
        let srv_tx = self.srv_tx.clone();

        tokio::spawn(async move {
            log::debug!("connection green thread - started");
            let mut connection_id = None;
            while let Some(event) = rx.recv().await {
                if let ConnectionEvent::Connected { connection_id: id } = event {
                    connection_id = Some(id);
                }
                if !addr.connected() {
                    // Covers an actor that stopped before it learned its id.
                    if let Some(from) = connection_id {
                        let _ = srv_tx.send(ServerCommand::Disconnect { from }).await;
                    }
                    break;
                }
                addr.do_send(ConnectionActorMessage(event));
            }
            log::debug!("connection green thread - terminated");
        });
    }

    fn stopping(&mut self, _: &mut Self::Context) -> Running {
        if let ConnectionState::Connected(from) = self.state {
            send_detached(&self.srv_tx, ServerCommand::Disconnect { from });
        }

        Running::Stop
    }
}

/// Ingress
impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for ConnectionActor {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => ctx.pong(&msg),
            Ok(ws::Message::Text(text)) => match decode_frame(&text) {
                Ok(message) => {
                    log::debug!("Ingress {:?}", message);
                    self.forward(message, ctx);
                }
                Err(err) => log::warn!("Ignoring invalid frame: {}", err),
            },
            Ok(ws::Message::Binary(bin)) => {
                log::debug!("Ignoring binary frame of {} bytes", bin.len());
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Err(err) => {
                log::warn!("Websocket protocol error: {}", err);
                ctx.stop();
            }
            _ => (),
        }
    }
}

/// Egress
impl Handler<ConnectionActorMessage> for ConnectionActor {
    type Result = ();

    fn handle(
        &mut self,
        msg: ConnectionActorMessage,
        ctx: &mut ws::WebsocketContext<Self>,
    ) -> Self::Result {
        match msg.0 {
            ConnectionEvent::Connected { connection_id } => {
                let pending = match std::mem::replace(
                    &mut self.state,
                    ConnectionState::Connected(connection_id),
                ) {
                    ConnectionState::Idle(pending) => pending,
                    ConnectionState::Connected(_) => Vec::new(),
                };
                for message in pending {
                    self.forward(message, ctx);
                }
            }
            ConnectionEvent::Relay(message) => match encode_frame(&message) {
                Ok(frame) => ctx.text(frame),
                Err(err) => log::error!("Cannot encode {:?}: {}", message, err),
            },
            ConnectionEvent::Disconnected => {
                ctx.close(Some(CloseReason {
                    code: CloseCode::Away,
                    description: None,
                }));
                ctx.stop();
            }
        }
    }
}

pub async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    srv_tx: web::Data<ServerTx>,
    config: web::Data<Config>,
) -> Result<HttpResponse, Error> {
    ws::start(
        ConnectionActor {
            state: ConnectionState::Idle(Vec::new()),
            srv_tx: srv_tx.get_ref().clone(),
            buffer: config.connection_buffer.max(1),
        },
        &req,
        stream,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use system::{DrawPayload, SessionId};

    #[test]
    fn it_decodes_client_frames() {
        let message = decode_frame(r#"{"event":"joinSession","data":"abcd1234"}"#).expect("");
        assert_eq!(message, ClientMessage::JoinSession(SessionId::from("abcd1234")));
    }

    #[test]
    fn it_reports_garbage_as_decode_error() {
        match decode_frame("not json") {
            Err(RelayError::Decode(_)) => (),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn it_reports_unknown_event_as_decode_error() {
        match decode_frame(r#"{"event":"erase","data":{}}"#) {
            Err(RelayError::Decode(_)) => (),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn it_decodes_draw_without_data() {
        let message = decode_frame(r#"{"event":"draw"}"#).expect("");
        assert_eq!(
            message,
            ClientMessage::Draw(DrawPayload(serde_json::Value::Null))
        );
    }

    #[test]
    fn it_encodes_server_frames() {
        assert_eq!(
            encode_frame(&ServerMessage::ClearCanvas).expect(""),
            r#"{"event":"clearCanvas"}"#
        );
    }
}
