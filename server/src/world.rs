//! Authoritative world state: the player-id to player mapping and the
//! combat resolution rules applied to it.
//!
//! Every public operation is a complete read-modify-write on one `Player`
//! record. Callers serialize access through a lock, so no reader ever sees a
//! partially applied mutation. Operations on ids that are no longer present
//! are silent no-ops; a disconnect racing a movement or attack event is
//! expected traffic, not an error.

use log::{info, warn};
use rand::Rng;
use shared::{Player, PlayerId, MAX_LIFE, SPAWN_X_MAX, SPAWN_X_MIN, SPAWN_Y_MAX, SPAWN_Y_MIN};
use std::collections::HashMap;

/// Result of applying damage to a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombatOutcome {
    /// Life to report to clients. On defeat this is already the respawned
    /// value; 0 is never handed out.
    pub new_life: i32,
    pub defeated: bool,
}

#[derive(Debug, Default)]
pub struct WorldState {
    players: HashMap<PlayerId, Player>,
}

impl WorldState {
    pub fn new() -> Self {
        Self {
            players: HashMap::new(),
        }
    }

    /// Spawns a player at a random position within the spawn bounds.
    ///
    /// A duplicate id means the connection layer broke its uniqueness
    /// guarantee; we log and overwrite rather than crash the world.
    pub fn create(&mut self, player_id: &str) -> Player {
        let mut rng = rand::thread_rng();
        let x = rng.gen_range(SPAWN_X_MIN..SPAWN_X_MAX);
        let y = rng.gen_range(SPAWN_Y_MIN..SPAWN_Y_MAX);
        let player = Player::new(player_id, x, y);

        if self
            .players
            .insert(player_id.to_string(), player.clone())
            .is_some()
        {
            warn!(
                "player {} created twice, overwriting previous entry",
                player_id
            );
        } else {
            info!("player {} spawned at ({}, {})", player_id, x, y);
        }
        player
    }

    /// Moves a player; last write wins. Returns the updated record, or
    /// `None` if the id is gone (race with disconnect).
    pub fn update_position(
        &mut self,
        player_id: &str,
        x: i32,
        y: i32,
        flip_x: bool,
    ) -> Option<Player> {
        let player = self.players.get_mut(player_id)?;
        player.x = x;
        player.y = y;
        player.flip_x = flip_x;
        Some(player.clone())
    }

    /// Applies damage and resolves defeat.
    ///
    /// Life dropping to 0 or below respawns the player at full life before
    /// the new value becomes visible anywhere; the outcome reports
    /// `defeated` so the relay can notify the victim.
    pub fn resolve_attack(&mut self, player_id: &str, damage: i32) -> Option<CombatOutcome> {
        let player = self.players.get_mut(player_id)?;
        let remaining = player.player_life - damage;
        if remaining > 0 {
            player.player_life = remaining;
            Some(CombatOutcome {
                new_life: remaining,
                defeated: false,
            })
        } else {
            player.player_life = MAX_LIFE;
            info!("player {} defeated, respawning at full life", player_id);
            Some(CombatOutcome {
                new_life: MAX_LIFE,
                defeated: true,
            })
        }
    }

    /// Removes a player. Idempotent; removing an absent id does nothing.
    pub fn remove(&mut self, player_id: &str) {
        if self.players.remove(player_id).is_some() {
            info!("player {} removed from world", player_id);
        }
    }

    /// Copy of the full player map, used to bootstrap a joining client.
    pub fn snapshot(&self) -> HashMap<PlayerId, Player> {
        self.players.clone()
    }

    pub fn contains(&self, player_id: &str) -> bool {
        self.players.contains_key(player_id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
