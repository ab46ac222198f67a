//! # Multiplayer Relay Server
//!
//! Authoritative server for the browser arena game. It tracks every
//! connected player in a single shared world, relays movement and combat
//! events between clients, and resolves combat outcomes (damage, defeat,
//! respawn) itself so no client ever decides another player's fate.
//!
//! ## Architecture
//!
//! One tokio task per WebSocket connection processes that connection's
//! events strictly in arrival order. The shared pieces — the connection
//! registry and the world state — sit behind `Arc<RwLock<_>>`, and every
//! store operation takes the lock for its whole read-modify-write, so no
//! partially applied player record is ever observable. The only await that
//! can suspend a connection mid-event is the identity-gateway round trip
//! during login, and no lock is held across it.
//!
//! Outbound delivery is fire-and-forget: each connection has an unbounded
//! queue drained by a writer task, and a send to a torn-down connection is
//! dropped silently. Missed notifications self-correct with the next
//! movement update.
//!
//! ## Module Organization
//!
//! - [`world`] — the player-id to player map and the combat rules applied
//!   to it (spawn, movement, damage, respawn).
//! - [`registry`] — live connections and their outbound queues; targeted
//!   send, broadcast-except-sender, broadcast-all.
//! - [`relay`] — the per-connection session state machine and the mapping
//!   from inbound events to world mutations and broadcasts.
//! - [`auth`] — the identity-gateway capability plus the in-process user
//!   directory (bcrypt-hashed credentials, unique emails).
//! - [`network`] — WebSocket accept loop and per-connection tasks.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::auth::MemoryUserDirectory;
//! use server::network::GameServer;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gateway = Arc::new(MemoryUserDirectory::new());
//!     let server = GameServer::bind("127.0.0.1:3000", gateway).await?;
//!     server.run().await
//! }
//! ```

pub mod auth;
pub mod network;
pub mod registry;
pub mod relay;
pub mod world;
