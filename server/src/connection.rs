use actix::{Actor, ActorContext, AsyncContext, Handler, Message, Running, StreamHandler};
use actix_web::{error, web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use serde::Deserialize;
use std::sync::Arc;

use system::{ClientMessage, ConnectionId, DecodeError, ParticipantId};

use crate::config::ServerConfig;
use crate::connection_tx_storage::ConnectionTx;
use crate::server::{resolve_session, ServerTx};
use crate::session::{SessionCommand, SessionTx};

pub const DEFAULT_SESSION_NAME: &str = "default";

#[derive(Debug)]
pub enum ConnectionCommand {
    Connect {
        connection_id: ConnectionId,
        tx: ConnectionTx,
    },
    Disconnect {
        connection_id: ConnectionId,
    },
    Inbound {
        connection_id: ConnectionId,
        message: ClientMessage,
    },
}

#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    Admitted { participant_id: ParticipantId },
    /// Already serialized server message, shared by every recipient.
    Text(Arc<str>),
}

#[derive(Message)]
#[rtype(result = "()")]
struct ConnectionActorMessage(ConnectionEvent);

enum ConnectionState {
    Connecting,
    Active(ParticipantId),
    Closed,
}

struct ConnectionActor {
    connection_id: ConnectionId,
    session_name: String,
    state: ConnectionState,
    session_tx: SessionTx,
}

impl ConnectionActor {
    fn send_command(&self, command: ConnectionCommand) {
        if self
            .session_tx
            .send(SessionCommand::Connection(command))
            .is_err()
        {
            log::warn!("Session {} is not running", self.session_name);
        }
    }
}

impl Actor for ConnectionActor {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<ConnectionEvent>();

        self.send_command(ConnectionCommand::Connect {
            connection_id: self.connection_id,
            tx,
        });

        let addr = ctx.address().recipient();
        let connection_id = self.connection_id;

        actix::spawn(async move {
            log::debug!("connection {} egress - started", connection_id);
            while let Some(event) = rx.recv().await {
                if !addr.connected() {
                    break;
                }
                addr.do_send(ConnectionActorMessage(event));
            }
            log::debug!("connection {} egress - terminated", connection_id);
        });
    }

    fn stopping(&mut self, _: &mut Self::Context) -> Running {
        // Teardown is announced once, whichever path stopped the actor.
        if let ConnectionState::Active(participant_id) = &self.state {
            log::debug!("Participant {} is disconnecting", participant_id);
        }
        if !matches!(self.state, ConnectionState::Closed) {
            self.state = ConnectionState::Closed;
            self.send_command(ConnectionCommand::Disconnect {
                connection_id: self.connection_id,
            });
        }

        Running::Stop
    }
}

/// Ingress
impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for ConnectionActor {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => ctx.pong(&msg),
            Ok(ws::Message::Text(text)) => {
                if let ConnectionState::Closed = self.state {
                    return;
                }
                match ClientMessage::decode(&text) {
                    Ok(message) => {
                        log::debug!("Ingress {} from {}", message.kind(), self.connection_id);
                        self.send_command(ConnectionCommand::Inbound {
                            connection_id: self.connection_id,
                            message,
                        });
                    }
                    Err(DecodeError::UnknownType(kind)) => {
                        log::warn!(
                            "Ignoring unknown message type {:?} from {}",
                            kind,
                            self.connection_id
                        );
                    }
                    Err(err) => {
                        log::warn!("Discarding frame from {}: {}", self.connection_id, err);
                    }
                }
            }
            Ok(ws::Message::Binary(bin)) => {
                log::debug!("Ignoring binary frame of {} bytes", bin.len());
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Err(ws::ProtocolError::Overflow) => {
                // The codec never buffered the frame, so the stream cannot resync.
                log::warn!("Frame from {} exceeds the size limit", self.connection_id);
                ctx.close(Some(ws::CloseReason {
                    code: ws::CloseCode::Size,
                    description: Some("frame too large".to_owned()),
                }));
                ctx.stop();
            }
            Err(err) => {
                log::warn!("Protocol error on {}: {}", self.connection_id, err);
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
            ConnectionEvent::Admitted { participant_id } => {
                if let ConnectionState::Connecting = self.state {
                    log::debug!(
                        "Connection {} is participant {} in {}",
                        self.connection_id,
                        participant_id,
                        self.session_name
                    );
                    self.state = ConnectionState::Active(participant_id);
                }
            }
            ConnectionEvent::Text(text) => {
                if let ConnectionState::Active(_) = self.state {
                    ctx.text(&*text);
                }
            }
        }
    }
}

#[derive(Deserialize)]
pub struct RoomQuery {
    room: Option<String>,
}

fn session_name(requested: Option<String>) -> String {
    requested
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_SESSION_NAME.to_owned())
}

pub async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    query: web::Query<RoomQuery>,
    srv_tx: web::Data<ServerTx>,
    config: web::Data<ServerConfig>,
) -> Result<HttpResponse, Error> {
    let name = session_name(query.into_inner().room);
    start_connection(name, req, stream, &srv_tx, &config).await
}

pub async fn ws_room(
    req: HttpRequest,
    stream: web::Payload,
    path: web::Path<String>,
    srv_tx: web::Data<ServerTx>,
    config: web::Data<ServerConfig>,
) -> Result<HttpResponse, Error> {
    let name = session_name(Some(path.into_inner()));
    start_connection(name, req, stream, &srv_tx, &config).await
}

async fn start_connection(
    session_name: String,
    req: HttpRequest,
    stream: web::Payload,
    srv_tx: &ServerTx,
    config: &ServerConfig,
) -> Result<HttpResponse, Error> {
    let session_tx = resolve_session(srv_tx, &session_name)
        .await
        .map_err(error::ErrorInternalServerError)?;
    let actor = ConnectionActor {
        connection_id: ConnectionId::new_v4(),
        session_name,
        state: ConnectionState::Connecting,
        session_tx,
    };
    ws::WsResponseBuilder::new(actor, &req, stream)
        .frame_size(config.max_frame_bytes)
        .start()
}
