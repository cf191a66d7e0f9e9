use crate::session::{spawn_session, SessionTx};
use std::collections::BTreeMap;
use system::Palette;

/// Session name -> running session. Sessions live as long as the process.
pub struct ServerState {
    palette: Palette,
    sessions: BTreeMap<String, SessionTx>,
}

impl ServerState {
    pub fn new(palette: Palette) -> Self {
        Self {
            palette,
            sessions: BTreeMap::new(),
        }
    }

    /// Returns the session named `name`, starting it on first reference.
    /// Must be called from within a tokio runtime.
    pub fn resolve(&mut self, name: &str) -> SessionTx {
        if let Some(session_tx) = self.sessions.get(name) {
            return session_tx.clone();
        }
        log::info!("Creating session {}", name);
        // every session cycles its own copy of the palette from the start
        let session_tx = spawn_session(name.to_owned(), self.palette.clone());
        self.sessions.insert(name.to_owned(), session_tx.clone());
        session_tx
    }

    pub fn lookup(&self, name: &str) -> Option<SessionTx> {
        self.sessions.get(name).cloned()
    }

    pub fn sessions(&self) -> Vec<(String, SessionTx)> {
        self.sessions
            .iter()
            .map(|(name, session_tx)| (name.clone(), session_tx.clone()))
            .collect()
    }
}
