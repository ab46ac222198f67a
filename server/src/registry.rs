//! Connection registry: every live WebSocket connection and its outbound
//! message queue.
//!
//! Delivery is fire-and-forget. Each handle wraps the unbounded channel
//! feeding that connection's writer task; if the channel is closed because
//! the connection is tearing down, the message is dropped silently. The next
//! state update self-corrects anything a client missed.

use log::{error, info, warn};
use shared::ServerEvent;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

/// One registered connection.
#[derive(Debug)]
pub struct ConnectionHandle {
    pub tx: mpsc::UnboundedSender<Message>,
    /// Set once the connection is admitted as a player. Game broadcasts go
    /// only to admitted connections.
    pub in_game: bool,
}

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<String, ConnectionHandle>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: HashMap::new(),
        }
    }

    /// Registers a freshly accepted connection. The transport layer
    /// guarantees id uniqueness; a duplicate is logged and replaced.
    pub fn register(&mut self, conn_id: &str, tx: mpsc::UnboundedSender<Message>) {
        let handle = ConnectionHandle { tx, in_game: false };
        if self.connections.insert(conn_id.to_string(), handle).is_some() {
            warn!("connection {} registered twice, replacing handle", conn_id);
        } else {
            info!("connection {} registered", conn_id);
        }
    }

    /// Removes a connection. Returns false if it was already gone.
    pub fn deregister(&mut self, conn_id: &str) -> bool {
        if self.connections.remove(conn_id).is_some() {
            info!("connection {} deregistered", conn_id);
            true
        } else {
            false
        }
    }

    /// Marks a connection as admitted to gameplay.
    pub fn set_in_game(&mut self, conn_id: &str) {
        if let Some(handle) = self.connections.get_mut(conn_id) {
            handle.in_game = true;
        }
    }

    pub fn contains(&self, conn_id: &str) -> bool {
        self.connections.contains_key(conn_id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Sends one event to one connection, whatever its session state.
    pub fn send_to(&self, conn_id: &str, event: &ServerEvent) {
        let Some(text) = encode(event) else { return };
        if let Some(handle) = self.connections.get(conn_id) {
            let _ = handle.tx.send(Message::Text(text));
        }
    }

    /// Sends one event to every in-game connection except `exclude`.
    pub fn broadcast_except(&self, exclude: &str, event: &ServerEvent) {
        let Some(text) = encode(event) else { return };
        for (conn_id, handle) in &self.connections {
            if conn_id == exclude || !handle.in_game {
                continue;
            }
            let _ = handle.tx.send(Message::Text(text.clone()));
        }
    }

    /// Sends one event to every in-game connection, sender included.
    pub fn broadcast_all(&self, event: &ServerEvent) {
        let Some(text) = encode(event) else { return };
        for handle in self.connections.values() {
            if !handle.in_game {
                continue;
            }
            let _ = handle.tx.send(Message::Text(text.clone()));
        }
    }
}

fn encode(event: &ServerEvent) -> Option<String> {
    match serde_json::to_string(event) {
        Ok(text) => Some(text),
        Err(e) => {
            error!("failed to encode server event: {}", e);
            None
        }
    }
}
