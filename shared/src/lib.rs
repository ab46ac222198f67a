use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub const SPAWN_X_MIN: i32 = 50;
pub const SPAWN_X_MAX: i32 = 450;
pub const SPAWN_Y_MIN: i32 = 50;
pub const SPAWN_Y_MAX: i32 = 550;
pub const MAX_LIFE: i32 = 100;

/// Opaque connection identifier; doubles as the player id once admitted.
pub type PlayerId = String;

/// Authoritative state for one admitted player.
///
/// Field names on the wire match what the browser client expects
/// (`playerId`, `flipX`, `playerLife`).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub player_id: PlayerId,
    pub x: i32,
    pub y: i32,
    pub flip_x: bool,
    pub player_life: i32,
}

impl Player {
    pub fn new(player_id: impl Into<PlayerId>, x: i32, y: i32) -> Self {
        Self {
            player_id: player_id.into(),
            x,
            y,
            flip_x: false,
            player_life: MAX_LIFE,
        }
    }
}

/// Events a client sends to the server.
///
/// Each WebSocket text frame carries one event: a name under `event` and a
/// structured payload under `data`. Decoding happens once at the transport
/// boundary; everything past that point dispatches on this closed set.
#[derive(Serialize, Deserialize, Clone)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "login")]
    Login {
        email: String,
        password: String,
        name: String,
    },
    #[serde(rename = "create-player")]
    CreatePlayer,
    #[serde(rename = "playerMovement", rename_all = "camelCase")]
    PlayerMovement { x: i32, y: i32, flip_x: bool },
    #[serde(rename = "playerMovementStop")]
    PlayerMovementStop,
    /// Cosmetic swing animation; carries no damage.
    #[serde(rename = "atk", rename_all = "camelCase")]
    Attack { player_id: PlayerId },
    /// A swing that connected with `player_id` for `atk_damage` points.
    /// `playerAtack` is the spelling older clients emit.
    #[serde(
        rename = "playerAttack",
        alias = "playerAtack",
        rename_all = "camelCase"
    )]
    PlayerAttack { player_id: PlayerId, atk_damage: i32 },
}

/// Hand-written so a logged event never carries the plaintext password.
impl fmt::Debug for ClientEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientEvent::Login { email, name, .. } => f
                .debug_struct("Login")
                .field("email", email)
                .field("password", &"<redacted>")
                .field("name", name)
                .finish(),
            ClientEvent::CreatePlayer => write!(f, "CreatePlayer"),
            ClientEvent::PlayerMovement { x, y, flip_x } => f
                .debug_struct("PlayerMovement")
                .field("x", x)
                .field("y", y)
                .field("flip_x", flip_x)
                .finish(),
            ClientEvent::PlayerMovementStop => write!(f, "PlayerMovementStop"),
            ClientEvent::Attack { player_id } => f
                .debug_struct("Attack")
                .field("player_id", player_id)
                .finish(),
            ClientEvent::PlayerAttack {
                player_id,
                atk_damage,
            } => f
                .debug_struct("PlayerAttack")
                .field("player_id", player_id)
                .field("atk_damage", atk_damage)
                .finish(),
        }
    }
}

/// Events the server sends to clients.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    /// Login succeeded; the client may now send `create-player`.
    #[serde(rename = "join-game")]
    JoinGame,
    /// User-displayable error message, sent only to the offending connection.
    #[serde(rename = "msg-error")]
    MsgError(String),
    /// Full world snapshot, sent to a newly admitted player.
    #[serde(rename = "currentPlayers")]
    CurrentPlayers(HashMap<PlayerId, Player>),
    #[serde(rename = "newPlayer")]
    NewPlayer(Player),
    #[serde(rename = "playerMoved")]
    PlayerMoved(Player),
    #[serde(rename = "playerMovementStop", rename_all = "camelCase")]
    PlayerMovementStop { player_id: PlayerId },
    #[serde(rename = "atk", rename_all = "camelCase")]
    Attack { player_id: PlayerId },
    /// Updated life after a resolved hit. On defeat `new_life` is already
    /// the respawned value; a life of 0 is never observable on the wire.
    #[serde(rename = "playerAttack", rename_all = "camelCase")]
    PlayerAttack { player_id: PlayerId, new_life: i32 },
    /// Sent to the defeated connection only.
    #[serde(rename = "kill")]
    Kill,
    /// A player left; payload is their id so remaining clients can despawn it.
    #[serde(rename = "disconnect")]
    PlayerDisconnected(PlayerId),
}
