//! WebSocket transport: accept loop, per-connection read task, and the
//! writer task behind each connection's outbound queue.
//!
//! One tokio task per connection reads frames and feeds them to the relay
//! in arrival order; a second task drains the outbound channel into the
//! socket. Errors in one connection's tasks never touch another connection.

use crate::auth::IdentityGateway;
use crate::registry::ConnectionRegistry;
use crate::relay::{Relay, SessionState};
use crate::world::WorldState;
use futures_util::{SinkExt, StreamExt};
use log::{info, warn};
use shared::ClientEvent;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, RwLock};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use uuid::Uuid;

/// The relay server: owns the listener and the shared world behind it.
pub struct GameServer {
    listener: TcpListener,
    relay: Relay,
}

impl GameServer {
    /// Binds the listener and wires up an empty world. Failing to bind is
    /// the only fatal startup error; everything later degrades
    /// per-connection.
    pub async fn bind(
        addr: &str,
        gateway: Arc<dyn IdentityGateway>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(addr).await?;
        info!("server listening on {}", listener.local_addr()?);

        let relay = Relay::new(
            Arc::new(RwLock::new(ConnectionRegistry::new())),
            Arc::new(RwLock::new(WorldState::new())),
            gateway,
        );
        Ok(Self { listener, relay })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections forever, spawning one task per client.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        loop {
            let (stream, addr) = self.listener.accept().await?;
            let conn_id = Uuid::new_v4().to_string();
            info!("connection {} accepted from {}", conn_id, addr);

            let relay = self.relay.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, relay, &conn_id).await {
                    warn!("connection {} ended with error: {}", conn_id, e);
                }
            });
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    relay: Relay,
    conn_id: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let ws_stream = accept_async(stream).await?;
    let (mut ws_write, mut ws_read) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    // Writer task: drains the outbound queue. Senders treat a closed
    // channel as a dropped delivery, so aborting this on disconnect is
    // safe.
    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_write.send(msg).await.is_err() {
                break;
            }
        }
    });

    relay.registry().write().await.register(conn_id, tx);
    let mut session = SessionState::Connected;

    while let Some(msg) = ws_read.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                // Transport error: same teardown as a clean close.
                warn!("connection {} transport error: {}", conn_id, e);
                break;
            }
        };
        match msg {
            Message::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(event) => relay.handle_event(conn_id, &mut session, event).await,
                Err(e) => {
                    warn!("connection {} sent malformed event, skipping: {}", conn_id, e);
                }
            },
            Message::Close(_) => break,
            // Control and binary frames carry no game events.
            _ => {}
        }
    }

    relay.handle_disconnect(conn_id, &mut session).await;
    writer.abort();
    Ok(())
}
