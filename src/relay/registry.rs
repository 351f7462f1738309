//! Last-known state of every connected player

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ws::protocol::PlayerUpdate;

use super::PlayerId;

/// Health a car spawns with
pub const MAX_HP: f64 = 100.0;

/// A connected player's last reported car state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRecord {
    pub id: PlayerId,
    pub color: String,
    pub x: f64,
    pub y: f64,
    /// Heading in radians
    pub rotation: f64,
    pub speed: f64,
    /// Health percentage (0-100)
    pub hp: f64,
    pub lights_on: bool,
}

impl PlayerRecord {
    /// Fresh record at the origin, full health, lights on
    pub fn new(id: PlayerId, color: String) -> Self {
        Self {
            id,
            color,
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            speed: 0.0,
            hp: MAX_HP,
            lights_on: true,
        }
    }

    /// Merge the fields present in `update`; absent fields are kept
    pub fn apply(&mut self, update: &PlayerUpdate) {
        if let Some(x) = update.x {
            self.x = x;
        }
        if let Some(y) = update.y {
            self.y = y;
        }
        if let Some(rotation) = update.rotation {
            self.rotation = rotation;
        }
        if let Some(speed) = update.speed {
            self.speed = speed;
        }
        if let Some(hp) = update.hp {
            self.hp = hp.clamp(0.0, MAX_HP);
        }
        if let Some(lights_on) = update.lights_on {
            self.lights_on = lights_on;
        }
    }
}

struct Entry {
    seq: u64,
    record: PlayerRecord,
}

/// Mapping from player id to last-known record
#[derive(Default)]
pub struct PlayerRegistry {
    players: HashMap<PlayerId, Entry>,
    next_seq: u64,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record. A record already stored under the same id is
    /// replaced and returned.
    pub fn register(&mut self, record: PlayerRecord) -> Option<PlayerRecord> {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.players
            .insert(record.id.clone(), Entry { seq, record })
            .map(|prev| prev.record)
    }

    /// Merge an update into a stored record. Unknown ids are ignored.
    pub fn update(&mut self, id: &PlayerId, update: &PlayerUpdate) -> Option<&PlayerRecord> {
        let entry = self.players.get_mut(id)?;
        entry.record.apply(update);
        Some(&entry.record)
    }

    pub fn remove(&mut self, id: &PlayerId) -> Option<PlayerRecord> {
        self.players.remove(id).map(|e| e.record)
    }

    pub fn get(&self, id: &PlayerId) -> Option<&PlayerRecord> {
        self.players.get(id).map(|e| &e.record)
    }

    pub fn contains(&self, id: &PlayerId) -> bool {
        self.players.contains_key(id)
    }

    /// All current records in insertion order
    pub fn snapshot(&self) -> Vec<PlayerRecord> {
        let mut entries: Vec<&Entry> = self.players.values().collect();
        entries.sort_by_key(|e| e.seq);
        entries.into_iter().map(|e| e.record.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> PlayerRecord {
        PlayerRecord::new(PlayerId::from(id), "#ff0000".to_string())
    }

    #[test]
    fn register_and_remove() {
        let mut registry = PlayerRegistry::new();
        assert!(registry.register(record("a")).is_none());
        assert!(registry.register(record("b")).is_none());
        assert_eq!(registry.len(), 2);

        let removed = registry.remove(&PlayerId::from("a")).unwrap();
        assert_eq!(removed.id, PlayerId::from("a"));
        assert!(!registry.contains(&PlayerId::from("a")));
        assert_eq!(registry.len(), 1);

        // removing twice is harmless
        assert!(registry.remove(&PlayerId::from("a")).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn colliding_register_replaces_previous() {
        let mut registry = PlayerRegistry::new();
        registry.register(record("a"));

        let mut again = record("a");
        again.color = "#0000ff".to_string();
        let prev = registry.register(again).unwrap();

        assert_eq!(prev.color, "#ff0000");
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&PlayerId::from("a")).unwrap().color, "#0000ff");
    }

    #[test]
    fn update_merges_only_present_fields() {
        let mut registry = PlayerRegistry::new();
        registry.register(record("a"));

        let merged = registry
            .update(
                &PlayerId::from("a"),
                &PlayerUpdate {
                    x: Some(5.0),
                    lights_on: Some(false),
                    ..Default::default()
                },
            )
            .unwrap()
            .clone();

        assert_eq!(merged.x, 5.0);
        assert!(!merged.lights_on);
        assert_eq!(merged.y, 0.0);
        assert_eq!(merged.hp, MAX_HP);
        assert_eq!(merged.color, "#ff0000");
    }

    #[test]
    fn update_for_unknown_id_is_noop() {
        let mut registry = PlayerRegistry::new();
        let result = registry.update(
            &PlayerId::from("ghost"),
            &PlayerUpdate {
                x: Some(1.0),
                ..Default::default()
            },
        );
        assert!(result.is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn hp_is_clamped() {
        let mut rec = record("a");
        rec.apply(&PlayerUpdate {
            hp: Some(-20.0),
            ..Default::default()
        });
        assert_eq!(rec.hp, 0.0);
        rec.apply(&PlayerUpdate {
            hp: Some(250.0),
            ..Default::default()
        });
        assert_eq!(rec.hp, MAX_HP);
    }

    #[test]
    fn snapshot_keeps_insertion_order() {
        let mut registry = PlayerRegistry::new();
        for id in ["c", "a", "b", "d"] {
            registry.register(record(id));
        }
        registry.remove(&PlayerId::from("b"));

        let ids: Vec<String> = registry
            .snapshot()
            .into_iter()
            .map(|r| r.id.to_string())
            .collect();
        assert_eq!(ids, vec!["c", "a", "d"]);
    }
}
