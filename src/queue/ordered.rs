//! Insertion-ordered map keyed by string id
//!
//! Backs both a group's message backlog and a queue's group index. Entries
//! are appended at the tail and can be removed by key without disturbing
//! the relative order of the remaining entries.

use std::collections::{BTreeMap, HashMap};

/// Insertion-ordered key → value container
///
/// Each insert takes the next slot number; traversal walks slots in
/// ascending order, so it always reflects insertion order.
#[derive(Debug)]
pub struct OrderedMap<V> {
    next_slot: u64,
    slots: HashMap<String, u64>,
    entries: BTreeMap<u64, (String, V)>,
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self {
            next_slot: 0,
            slots: HashMap::new(),
            entries: BTreeMap::new(),
        }
    }

    /// Append at the tail. Returns the value back if the key is present.
    pub fn insert(&mut self, key: String, value: V) -> Result<(), V> {
        if self.slots.contains_key(&key) {
            return Err(value);
        }
        let slot = self.next_slot;
        self.next_slot += 1;
        self.slots.insert(key.clone(), slot);
        self.entries.insert(slot, (key, value));
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Option<V> {
        let slot = self.slots.remove(key)?;
        self.entries.remove(&slot).map(|(_, value)| value)
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        let slot = self.slots.get(key)?;
        self.entries.get(slot).map(|(_, value)| value)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        let slot = self.slots.get(key)?;
        self.entries.get_mut(slot).map(|(_, value)| value)
    }

    /// Value for `key`, inserting `make()` at the tail when absent
    pub fn get_or_insert_with(&mut self, key: &str, make: impl FnOnce() -> V) -> &mut V {
        let slot = match self.slots.get(key) {
            Some(slot) => *slot,
            None => {
                let slot = self.next_slot;
                self.next_slot += 1;
                self.slots.insert(key.to_string(), slot);
                slot
            }
        };
        let (_, value) = self
            .entries
            .entry(slot)
            .or_insert_with(|| (key.to_string(), make()));
        value
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// In-order traversal
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries
            .values()
            .map(|(key, value)| (key.as_str(), value))
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.values().map(|(_, value)| value)
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.entries.values_mut().map(|(_, value)| value)
    }

    /// Keep only entries for which `keep` returns true; returns how many were dropped
    pub fn retain(&mut self, mut keep: impl FnMut(&str, &mut V) -> bool) -> usize {
        let before = self.entries.len();
        let slots = &mut self.slots;
        self.entries.retain(|_, (key, value)| {
            if keep(key, value) {
                true
            } else {
                slots.remove(key.as_str());
                false
            }
        });
        before - self.entries.len()
    }
}
