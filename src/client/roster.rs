//! Client-side mirror of the other players

use std::collections::HashMap;

use crate::relay::{PlayerId, PlayerRecord};
use crate::ws::protocol::ServerMsg;

/// What one client knows about itself and everybody else
#[derive(Debug, Default)]
pub struct Roster {
    own: Option<PlayerRecord>,
    others: HashMap<PlayerId, PlayerRecord>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a server message into the roster
    pub fn apply(&mut self, msg: &ServerMsg) {
        match msg {
            ServerMsg::Init { player, players } => {
                self.others = players
                    .iter()
                    .filter(|p| p.id != player.id)
                    .map(|p| (p.id.clone(), p.clone()))
                    .collect();
                self.own = Some(player.clone());
            }
            ServerMsg::PlayerJoin { player } | ServerMsg::PlayerUpdate { player } => {
                if self.own_id() != Some(&player.id) {
                    self.others.insert(player.id.clone(), player.clone());
                }
            }
            ServerMsg::PlayerLeave { player_id } => {
                self.others.remove(player_id);
            }
        }
    }

    /// Id assigned by the last `init`
    pub fn own_id(&self) -> Option<&PlayerId> {
        self.own.as_ref().map(|p| &p.id)
    }

    /// Colour assigned by the last `init`
    pub fn own_color(&self) -> Option<&str> {
        self.own.as_ref().map(|p| p.color.as_str())
    }

    pub fn get(&self, id: &PlayerId) -> Option<&PlayerRecord> {
        self.others.get(id)
    }

    pub fn others(&self) -> impl Iterator<Item = &PlayerRecord> {
        self.others.values()
    }

    pub fn len(&self) -> usize {
        self.others.len()
    }

    pub fn is_empty(&self) -> bool {
        self.others.is_empty()
    }
}
