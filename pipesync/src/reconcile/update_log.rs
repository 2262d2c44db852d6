//! Keyed, insertion-ordered log of incremental updates.

use std::collections::HashMap;
use std::hash::Hash;

use crate::core::UnitId;
use crate::protocol::{SceneUpdate, StatusUpdate};
use crate::utils::Timestamp;

/// Logical key of an incremental update.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UpdateKey {
    /// A unit-level status update.
    Unit(UnitId),
    /// A scene-level (or shot-level) update.
    Scene {
        /// The owning unit.
        unit_id: UnitId,
        /// The scene.
        scene_id: String,
        /// The shot, for shot-level updates.
        shot_id: Option<String>,
    },
}

/// An accepted incremental update.
#[derive(Debug, Clone, PartialEq)]
pub enum IncrementalUpdate {
    /// A unit status change.
    Status(StatusUpdate),
    /// A scene or shot status change.
    Scene(SceneUpdate),
}

impl IncrementalUpdate {
    /// Returns the logical key of the update.
    #[must_use]
    pub fn key(&self) -> UpdateKey {
        match self {
            Self::Status(update) => UpdateKey::Unit(update.unit_id.clone()),
            Self::Scene(update) => UpdateKey::Scene {
                unit_id: update.unit_id.clone(),
                scene_id: update.scene_id.clone(),
                shot_id: update.shot_id.clone(),
            },
        }
    }

    /// Returns the update timestamp.
    #[must_use]
    pub fn timestamp(&self) -> Timestamp {
        match self {
            Self::Status(update) => update.timestamp,
            Self::Scene(update) => update.timestamp,
        }
    }

    /// Returns the unit the update refers to.
    #[must_use]
    pub fn unit_id(&self) -> &UnitId {
        match self {
            Self::Status(update) => &update.unit_id,
            Self::Scene(update) => &update.unit_id,
        }
    }
}

/// Result of offering an update to the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// The key was new; the update was appended.
    Inserted,
    /// An older record for the key was replaced in place.
    Replaced,
    /// A record at least as new already exists; nothing changed.
    Stale,
}

/// Latest update per key, enumerable in first-insertion order.
#[derive(Debug, Clone)]
pub struct UpdateLog<K = UpdateKey, V = IncrementalUpdate> {
    positions: HashMap<K, usize>,
    entries: Vec<V>,
}

impl<K, V> Default for UpdateLog<K, V> {
    fn default() -> Self {
        Self {
            positions: HashMap::new(),
            entries: Vec::new(),
        }
    }
}

impl<K: Eq + Hash, V> UpdateLog<K, V> {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `key` unless an existing record is at least as
    /// new according to `timestamp`.
    pub fn upsert<T: Ord>(&mut self, key: K, value: V, timestamp: impl Fn(&V) -> T) -> Upsert {
        if let Some(&pos) = self.positions.get(&key) {
            let existing = &mut self.entries[pos];
            if timestamp(existing) >= timestamp(&value) {
                return Upsert::Stale;
            }
            *existing = value;
            return Upsert::Replaced;
        }

        self.positions.insert(key, self.entries.len());
        self.entries.push(value);
        Upsert::Inserted
    }

    /// Returns the record for a key.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.positions.get(key).map(|&pos| &self.entries[pos])
    }

    /// Iterates records in first-insertion order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &V> + ExactSizeIterator + '_ {
        self.entries.iter()
    }

    /// Returns the number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every record.
    pub fn clear(&mut self) {
        self.positions.clear();
        self.entries.clear();
    }
}

impl UpdateLog {
    /// Offers an incremental update, keyed by its logical key.
    pub fn offer(&mut self, update: IncrementalUpdate) -> Upsert {
        self.upsert(update.key(), update, IncrementalUpdate::timestamp)
    }
}
