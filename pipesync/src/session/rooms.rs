//! Reference-counted room membership.

use std::collections::HashMap;

use crate::core::Scope;

/// Tracks how many open sessions share each room.
///
/// The transport joins a room when its count goes from zero to one and
/// leaves it when the count drops back to zero.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    counts: HashMap<Scope, usize>,
}

impl RoomRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one more session for `scope`. Returns true if this is the
    /// first one.
    pub fn join(&mut self, scope: &Scope) -> bool {
        let count = self.counts.entry(scope.clone()).or_insert(0);
        *count += 1;
        *count == 1
    }

    /// Unregisters one session for `scope`. Returns true if it was the last
    /// one. Leaving a room that was never joined returns false.
    pub fn leave(&mut self, scope: &Scope) -> bool {
        let Some(count) = self.counts.get_mut(scope) else {
            return false;
        };
        *count -= 1;
        if *count == 0 {
            self.counts.remove(scope);
            true
        } else {
            false
        }
    }

    /// Returns how many sessions share `scope`.
    #[must_use]
    pub fn count(&self, scope: &Scope) -> usize {
        self.counts.get(scope).copied().unwrap_or(0)
    }

    /// Returns every joined room.
    #[must_use]
    pub fn scopes(&self) -> Vec<Scope> {
        self.counts.keys().cloned().collect()
    }

    /// Returns the distinct users with at least one joined room.
    #[must_use]
    pub fn users(&self) -> Vec<String> {
        let mut users: Vec<String> = self.counts.keys().map(|s| s.user_id.clone()).collect();
        users.sort();
        users.dedup();
        users
    }

    /// Returns true if no room is joined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_counting() {
        let mut rooms = RoomRegistry::new();
        let scope = Scope::pipeline_run("u", "s", "v");

        assert!(rooms.join(&scope));
        assert!(!rooms.join(&scope));
        assert_eq!(rooms.count(&scope), 2);

        assert!(!rooms.leave(&scope));
        assert!(rooms.leave(&scope));
        assert!(rooms.is_empty());
    }

    #[test]
    fn test_leave_unknown_room() {
        let mut rooms = RoomRegistry::new();
        assert!(!rooms.leave(&Scope::user("u")));
    }

    #[test]
    fn test_users_are_distinct() {
        let mut rooms = RoomRegistry::new();
        rooms.join(&Scope::user("b"));
        rooms.join(&Scope::pipeline_run("a", "s", "v"));
        rooms.join(&Scope::pipeline_run("b", "s", "v"));

        assert_eq!(rooms.users(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(rooms.scopes().len(), 3);
    }
}
