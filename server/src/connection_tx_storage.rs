use crate::connection::ConnectionEvent;
use std::collections::HashMap;
use system::ConnectionId;

/// Unbounded so a slow but live peer never loses an event.
pub type ConnectionTx = tokio::sync::mpsc::UnboundedSender<ConnectionEvent>;

/// Outbound channels of the connections in one session.
///
/// Delivery is at-most-once: a closed channel loses the event for that
/// connection only and nothing is retried.
pub struct ConnectionTxStorage {
    connection_txs: HashMap<ConnectionId, ConnectionTx>,
}

impl ConnectionTxStorage {
    pub fn new() -> Self {
        Self {
            connection_txs: HashMap::new(),
        }
    }

    pub fn insert(&mut self, connection_id: ConnectionId, tx: ConnectionTx) {
        self.connection_txs.insert(connection_id, tx);
    }

    pub fn send(&self, to: &ConnectionId, event: ConnectionEvent) -> bool {
        match self.connection_txs.get(to) {
            Some(tx) => {
                if tx.send(event).is_err() {
                    log::debug!("Connection {} is already closed, skipping", to);
                    false
                } else {
                    true
                }
            }
            None => {
                log::debug!("No outbound channel for connection {}", to);
                false
            }
        }
    }

    pub fn remove(&mut self, connection_id: &ConnectionId) -> Option<ConnectionTx> {
        self.connection_txs.remove(connection_id)
    }
}
