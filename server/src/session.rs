use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tokio::sync::oneshot;

use system::{
    ClientMessage, ConnectionId, Palette, Participant, ParticipantDirectory, ParticipantId,
    ParticipantSummary, ServerMessage, Stroke, StrokeStore, SELF_CHAT_LABEL,
};

use crate::connection::{ConnectionCommand, ConnectionEvent};
use crate::connection_tx_storage::{ConnectionTx, ConnectionTxStorage};

/// Unbounded so actor callbacks, which cannot wait, never lose a teardown.
pub type SessionTx = UnboundedSender<SessionCommand>;

#[derive(Debug)]
pub enum SessionCommand {
    Connection(ConnectionCommand),
    Describe {
        tx: oneshot::Sender<SessionDescription>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionDescription {
    pub name: String,
    pub users: Vec<ParticipantSummary>,
    pub strokes: Vec<Stroke>,
    pub undone: usize,
}

/// Sole owner of one session's strokes and roster. Commands are applied
/// one at a time, so every mutation and snapshot is atomic.
pub struct Session {
    name: String,
    strokes: StrokeStore,
    participants: ParticipantDirectory,
    connections: ConnectionTxStorage,
}

impl Session {
    pub fn new(name: String, palette: Palette) -> Self {
        Self {
            name,
            strokes: StrokeStore::new(),
            participants: ParticipantDirectory::new(palette),
            connections: ConnectionTxStorage::new(),
        }
    }

    pub fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Connection(ConnectionCommand::Connect { connection_id, tx }) => {
                self.connect(connection_id, tx)
            }
            SessionCommand::Connection(ConnectionCommand::Disconnect { connection_id }) => {
                self.disconnect(&connection_id)
            }
            SessionCommand::Connection(ConnectionCommand::Inbound {
                connection_id,
                message,
            }) => self.handle_client_message(&connection_id, message),
            SessionCommand::Describe { tx } => {
                let _ = tx.send(self.describe());
            }
        }
    }

    fn connect(&mut self, connection_id: ConnectionId, tx: ConnectionTx) {
        if self.participants.by_connection(&connection_id).is_some() {
            log::warn!("Connection {} is already admitted", connection_id);
            return;
        }
        self.connections.insert(connection_id, tx);
        let participant = self.participants.admit(connection_id);
        log::info!(
            "{} ({}) joined session {}",
            participant.name,
            participant.id,
            self.name
        );

        self.connections.send(
            &connection_id,
            ConnectionEvent::Admitted {
                participant_id: participant.id.clone(),
            },
        );
        self.send_to(
            &connection_id,
            &ServerMessage::Init {
                client_id: participant.id,
                color: participant.color,
                name: participant.name,
                room: self.name.clone(),
            },
        );
        self.send_to(&connection_id, &self.full_update());
        self.broadcast(None, &self.roster());
    }

    fn disconnect(&mut self, connection_id: &ConnectionId) {
        self.connections.remove(connection_id);
        if let Some(participant) = self.participants.remove_connection(connection_id) {
            log::info!(
                "{} ({}) left session {}, {} remaining",
                participant.name,
                participant.id,
                self.name,
                self.participants.count()
            );
            self.broadcast(None, &self.roster());
        }
    }

    fn handle_client_message(&mut self, connection_id: &ConnectionId, message: ClientMessage) {
        let sender: Participant = match self.participants.by_connection(connection_id) {
            Some(participant) => participant.clone(),
            None => {
                log::warn!(
                    "Dropping {} from connection {} outside session {}",
                    message.kind(),
                    connection_id,
                    self.name
                );
                return;
            }
        };

        match message {
            ClientMessage::Draw { stroke } => {
                let stroke = stroke.authored_by(sender.id.clone());
                self.strokes.append(stroke.clone());
                self.broadcast(None, &ServerMessage::Draw { stroke });
            }
            ClientMessage::Cursor { x, y } => {
                self.broadcast(
                    Some(&sender.id),
                    &ServerMessage::Cursor {
                        user_id: sender.id.clone(),
                        x,
                        y,
                        color: sender.color,
                        name: sender.name,
                    },
                );
            }
            ClientMessage::Undo => {
                if !self.strokes.undo() {
                    log::debug!("Nothing to undo in session {}", self.name);
                }
                self.broadcast(None, &self.full_update());
            }
            ClientMessage::Redo => {
                if !self.strokes.redo() {
                    log::debug!("Nothing to redo in session {}", self.name);
                }
                self.broadcast(None, &self.full_update());
            }
            ClientMessage::Clear => {
                self.strokes.clear();
                self.broadcast(None, &self.full_update());
            }
            ClientMessage::SetName { name } => {
                self.participants.rename(&sender.id, &name);
                self.broadcast(None, &self.roster());
            }
            ClientMessage::Chat { text } => {
                self.broadcast(
                    Some(&sender.id),
                    &ServerMessage::Chat {
                        from: sender.name,
                        text: text.clone(),
                    },
                );
                self.send_to(
                    connection_id,
                    &ServerMessage::Chat {
                        from: SELF_CHAT_LABEL.to_owned(),
                        text,
                    },
                );
            }
            ClientMessage::LoadSession { data } => {
                log::info!(
                    "{} loaded {} strokes into session {}",
                    sender.id,
                    data.strokes.len(),
                    self.name
                );
                self.strokes.replace(data.strokes);
                self.broadcast(None, &self.full_update());
            }
        }
    }

    fn full_update(&self) -> ServerMessage {
        ServerMessage::FullUpdate {
            strokes: self.strokes.snapshot().to_vec(),
        }
    }

    fn roster(&self) -> ServerMessage {
        ServerMessage::Users {
            users: self.participants.list(),
        }
    }

    fn describe(&self) -> SessionDescription {
        SessionDescription {
            name: self.name.clone(),
            users: self.participants.list(),
            strokes: self.strokes.snapshot().to_vec(),
            undone: self.strokes.undone().len(),
        }
    }

    /// Fan-out: serializes once and delivers to every live participant
    /// except `without`.
    fn broadcast(&self, without: Option<&ParticipantId>, message: &ServerMessage) {
        let text = match encode(message) {
            Some(text) => text,
            None => return,
        };
        log::debug!("Egress {} to session {}", message.kind(), self.name);
        for participant in self.participants.iter() {
            if without.map_or(false, |id| id == &participant.id) {
                continue;
            }
            self.connections.send(
                &participant.connection_id,
                ConnectionEvent::Text(text.clone()),
            );
        }
    }

    fn send_to(&self, connection_id: &ConnectionId, message: &ServerMessage) {
        if let Some(text) = encode(message) {
            self.connections
                .send(connection_id, ConnectionEvent::Text(text));
        }
    }
}

fn encode(message: &ServerMessage) -> Option<Arc<str>> {
    match message.encode() {
        Ok(text) => Some(Arc::from(text)),
        Err(err) => {
            log::warn!("Failed to serialize {}: {}", message.kind(), err);
            None
        }
    }
}

pub fn spawn_session(name: String, palette: Palette) -> SessionTx {
    let (session_tx, mut session_rx) = unbounded_channel::<SessionCommand>();

    tokio::spawn(async move {
        let mut session = Session::new(name, palette);

        while let Some(command) = session_rx.recv().await {
            session.handle_command(command);
        }
        log::debug!("session {} - terminated", session.name);
    });

    session_tx
}

pub async fn describe_session(session_tx: &SessionTx) -> Option<SessionDescription> {
    let (tx, rx) = oneshot::channel();
    session_tx.send(SessionCommand::Describe { tx }).ok()?;
    rx.await.ok()
}
