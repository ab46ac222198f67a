//! Event relay: decodes client intent into world mutations and outbound
//! broadcasts.
//!
//! Each connection walks an explicit session state machine:
//! `Connected -> Authenticated -> InGame -> Terminated`. Events arriving
//! before their required state are ignored rather than rejected; a client
//! can never move or attack before being admitted. The relay owns no state
//! of its own, it mediates between the connection registry, the world
//! store, and the identity gateway it is constructed with.

use crate::auth::{IdentityGateway, LoginOutcome};
use crate::registry::ConnectionRegistry;
use crate::world::WorldState;
use log::{debug, error, info};
use shared::{ClientEvent, ServerEvent};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shown to the client when the directory itself fails; the real reason
/// goes to the server log only.
pub const LOGIN_FAILURE_MESSAGE: &str = "login failed, please try again";

/// Per-connection protocol state. Owned by the connection's task; never
/// shared between connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    Authenticated,
    InGame,
    Terminated,
}

#[derive(Clone)]
pub struct Relay {
    registry: Arc<RwLock<ConnectionRegistry>>,
    world: Arc<RwLock<WorldState>>,
    gateway: Arc<dyn IdentityGateway>,
}

impl Relay {
    pub fn new(
        registry: Arc<RwLock<ConnectionRegistry>>,
        world: Arc<RwLock<WorldState>>,
        gateway: Arc<dyn IdentityGateway>,
    ) -> Self {
        Self {
            registry,
            world,
            gateway,
        }
    }

    pub fn registry(&self) -> &Arc<RwLock<ConnectionRegistry>> {
        &self.registry
    }

    /// Applies one inbound event for `conn_id`.
    ///
    /// Events are handed in per-connection arrival order by the transport
    /// task, which awaits each call before reading the next frame.
    pub async fn handle_event(
        &self,
        conn_id: &str,
        session: &mut SessionState,
        event: ClientEvent,
    ) {
        match (*session, event) {
            (
                SessionState::Connected,
                ClientEvent::Login {
                    email,
                    password,
                    name,
                },
            ) => {
                self.handle_login(conn_id, session, &email, &password, &name)
                    .await;
            }
            (SessionState::Authenticated, ClientEvent::CreatePlayer) => {
                self.handle_create_player(conn_id, session).await;
            }
            (SessionState::InGame, ClientEvent::PlayerMovement { x, y, flip_x }) => {
                let updated = self
                    .world
                    .write()
                    .await
                    .update_position(conn_id, x, y, flip_x);
                if let Some(player) = updated {
                    self.registry
                        .read()
                        .await
                        .broadcast_except(conn_id, &ServerEvent::PlayerMoved(player));
                }
            }
            (SessionState::InGame, ClientEvent::PlayerMovementStop) => {
                self.registry.read().await.broadcast_except(
                    conn_id,
                    &ServerEvent::PlayerMovementStop {
                        player_id: conn_id.to_string(),
                    },
                );
            }
            (SessionState::InGame, ClientEvent::Attack { .. }) => {
                // Cosmetic swing; the attacker id comes from the session,
                // not from the payload.
                self.registry.read().await.broadcast_except(
                    conn_id,
                    &ServerEvent::Attack {
                        player_id: conn_id.to_string(),
                    },
                );
            }
            (
                SessionState::InGame,
                ClientEvent::PlayerAttack {
                    player_id: target,
                    atk_damage,
                },
            ) => {
                self.handle_player_attack(conn_id, &target, atk_damage).await;
            }
            (state, event) => {
                debug!(
                    "connection {} sent {:?} in state {:?}, ignoring",
                    conn_id, event, state
                );
            }
        }
    }

    /// Tears down `conn_id`: deregisters the connection, removes its player
    /// (if admitted) and tells everyone else. Transport errors and clean
    /// closes both land here.
    pub async fn handle_disconnect(&self, conn_id: &str, session: &mut SessionState) {
        let was_in_game = *session == SessionState::InGame;
        *session = SessionState::Terminated;

        self.registry.write().await.deregister(conn_id);
        if was_in_game {
            self.world.write().await.remove(conn_id);
            self.registry
                .read()
                .await
                .broadcast_all(&ServerEvent::PlayerDisconnected(conn_id.to_string()));
        }
    }

    async fn handle_login(
        &self,
        conn_id: &str,
        session: &mut SessionState,
        email: &str,
        password: &str,
        name: &str,
    ) {
        // The only suspension point: no lock is held across this await.
        let result = self.gateway.verify_or_create(email, password, name).await;

        let registry = self.registry.read().await;
        if !registry.contains(conn_id) {
            // Connection went away while the lookup was in flight; the
            // outcome must not be applied to a gone connection.
            debug!("connection {} closed during login, discarding result", conn_id);
            return;
        }

        match result {
            Ok(outcome @ (LoginOutcome::Authenticated | LoginOutcome::Created)) => {
                info!("connection {} logged in as {} ({:?})", conn_id, email, outcome);
                registry.send_to(conn_id, &ServerEvent::JoinGame);
                *session = SessionState::Authenticated;
            }
            Ok(LoginOutcome::Rejected(reason)) => {
                info!("connection {} login rejected for {}", conn_id, email);
                registry.send_to(conn_id, &ServerEvent::MsgError(reason));
            }
            Err(e) => {
                error!("directory error during login for {}: {}", conn_id, e);
                registry.send_to(
                    conn_id,
                    &ServerEvent::MsgError(LOGIN_FAILURE_MESSAGE.to_string()),
                );
            }
        }
    }

    async fn handle_create_player(&self, conn_id: &str, session: &mut SessionState) {
        // The registry lock is taken before the world lock is released:
        // between this snapshot and the broadcast below, no other join can
        // slip in and leave the two players unaware of each other.
        let mut world = self.world.write().await;
        let mut registry = self.registry.write().await;
        let player = world.create(conn_id);
        let snapshot = world.snapshot();
        drop(world);

        registry.set_in_game(conn_id);
        *session = SessionState::InGame;

        registry.send_to(conn_id, &ServerEvent::CurrentPlayers(snapshot));
        registry.broadcast_except(conn_id, &ServerEvent::NewPlayer(player));
    }

    async fn handle_player_attack(&self, conn_id: &str, target: &str, damage: i32) {
        let outcome = self.world.write().await.resolve_attack(target, damage);
        let Some(outcome) = outcome else {
            // Target already gone; benign race with its disconnect.
            return;
        };

        debug!(
            "connection {} hit {} for {}, life now {}",
            conn_id, target, damage, outcome.new_life
        );

        let registry = self.registry.read().await;
        registry.broadcast_all(&ServerEvent::PlayerAttack {
            player_id: target.to_string(),
            new_life: outcome.new_life,
        });
        if outcome.defeated {
            registry.send_to(target, &ServerEvent::Kill);
        }
    }
}
