//! Event registry
//!
//! Owns every registered `EventDefinition`, keyed by case-sensitive ID.
//! Duplicate registration never overwrites: the first definition wins and
//! the rejected attempt is logged so a mod author notices the collision.

use std::collections::HashMap;

use tracing::warn;

use super::EventDefinition;

#[derive(Debug, Default)]
pub struct EventRegistry {
    events: HashMap<String, EventDefinition>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition under `id`.
    ///
    /// Returns false and keeps the existing definition when the ID is
    /// already taken.
    pub fn register(&mut self, id: impl Into<String>, def: EventDefinition) -> bool {
        let id = id.into();
        if self.events.contains_key(&id) {
            warn!(event_id = %id, "duplicate event registration ignored");
            return false;
        }
        self.events.insert(id, def);
        true
    }

    /// Remove a definition. No-op when the ID is unknown.
    pub fn unregister(&mut self, id: &str) -> bool {
        self.events.remove(id).is_some()
    }

    /// Change the bit cost of a registered event in place.
    ///
    /// Listings reflect the new cost immediately; a cost of 0 removes the
    /// event from amount selection without unregistering it. No-op when the
    /// ID is unknown.
    pub fn set_cost(&mut self, id: &str, bit_cost: u32) -> bool {
        match self.events.get_mut(id) {
            Some(def) => {
                def.bit_cost = bit_cost;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &str) -> Option<&EventDefinition> {
        self.events.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut EventDefinition> {
        self.events.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.events.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &EventDefinition)> {
        self.events.iter().map(|(id, def)| (id.as_str(), def))
    }

    /// Biddable events (`bit_cost > 0`), cheapest first, ties broken by ID.
    pub fn list_by_cost(&self) -> Vec<(&str, u32)> {
        let mut entries: Vec<(&str, u32)> = self
            .events
            .iter()
            .filter(|(_, def)| def.bit_cost > 0)
            .map(|(id, def)| (id.as_str(), def.bit_cost))
            .collect();
        entries.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
        entries
    }

    /// Every event in `list_by_cost` order, name-only events included.
    pub fn list_all(&self) -> Vec<(&str, u32)> {
        let mut entries: Vec<(&str, u32)> = self
            .events
            .iter()
            .map(|(id, def)| (id.as_str(), def.bit_cost))
            .collect();
        entries.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
        entries
    }

    /// Chat lines advertising the priced catalog, one event per line.
    pub fn price_lines(&self) -> Vec<String> {
        self.list_by_cost()
            .into_iter()
            .map(|(id, cost)| format!("[ {id} ]: {cost} bits"))
            .collect()
    }

    /// Chat lines for the full catalog; name-only events omit the price.
    pub fn catalog_lines(&self) -> Vec<String> {
        self.list_all()
            .into_iter()
            .map(|(id, cost)| {
                if cost > 0 {
                    format!("[ {id} ]: {cost} bits")
                } else {
                    format!("[ {id} ]")
                }
            })
            .collect()
    }
}
