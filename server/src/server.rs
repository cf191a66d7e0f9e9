use thiserror::Error;
use tokio::sync::mpsc::{channel, Sender};
use tokio::sync::oneshot;

use system::Palette;

use crate::server_state::ServerState;
use crate::session::SessionTx;

pub type ServerTx = Sender<ServerCommand>;

#[derive(Debug)]
pub enum ServerCommand {
    ResolveSession {
        name: String,
        tx: oneshot::Sender<SessionTx>,
    },
    LookupSession {
        name: String,
        tx: oneshot::Sender<Option<SessionTx>>,
    },
    ListSessions {
        tx: oneshot::Sender<Vec<(String, SessionTx)>>,
    },
}

#[derive(Debug, Error)]
#[error("session registry is not running")]
pub struct RegistryClosed;

struct Server {
    server_state: ServerState,
}

impl Server {
    fn new(palette: Palette) -> Self {
        Self {
            server_state: ServerState::new(palette),
        }
    }

    fn handle_command(&mut self, command: ServerCommand) {
        // A dropped receiver means the requester went away; nothing to do.
        match command {
            ServerCommand::ResolveSession { name, tx } => {
                let _ = tx.send(self.server_state.resolve(&name));
            }
            ServerCommand::LookupSession { name, tx } => {
                let _ = tx.send(self.server_state.lookup(&name));
            }
            ServerCommand::ListSessions { tx } => {
                let _ = tx.send(self.server_state.sessions());
            }
        }
    }
}

/// Starts the session registry. Resolution is serialized here, so only one
/// session is ever created per name.
pub fn spawn_server(palette: Palette) -> ServerTx {
    let (srv_tx, mut srv_rx) = channel::<ServerCommand>(16);

    tokio::spawn(async move {
        let mut server = Server::new(palette);

        while let Some(command) = srv_rx.recv().await {
            server.handle_command(command);
        }
    });

    srv_tx
}

async fn request<T>(
    srv_tx: &ServerTx,
    command: impl FnOnce(oneshot::Sender<T>) -> ServerCommand,
) -> Result<T, RegistryClosed> {
    let (tx, rx) = oneshot::channel();
    srv_tx.send(command(tx)).await.map_err(|_| RegistryClosed)?;
    rx.await.map_err(|_| RegistryClosed)
}

pub async fn resolve_session(srv_tx: &ServerTx, name: &str) -> Result<SessionTx, RegistryClosed> {
    let name = name.to_owned();
    request(srv_tx, |tx| ServerCommand::ResolveSession { name, tx }).await
}

pub async fn lookup_session(
    srv_tx: &ServerTx,
    name: &str,
) -> Result<Option<SessionTx>, RegistryClosed> {
    let name = name.to_owned();
    request(srv_tx, |tx| ServerCommand::LookupSession { name, tx }).await
}

pub async fn list_sessions(srv_tx: &ServerTx) -> Result<Vec<(String, SessionTx)>, RegistryClosed> {
    request(srv_tx, |tx| ServerCommand::ListSessions { tx }).await
}
