//! Latest-known state of every monster in a batch.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use trainerhub_domain::{Monster, MonsterId, MonsterPatch};

/// Per-monster snapshots, updated as operations succeed.
///
/// Seeded once from the batch's monsters. Patches for monsters outside the
/// batch are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotTracker {
    order: Vec<MonsterId>,
    snapshots: HashMap<MonsterId, Monster>,
}

impl SnapshotTracker {
    pub fn new(monsters: &[Monster]) -> Self {
        let mut order = Vec::with_capacity(monsters.len());
        let mut snapshots = HashMap::with_capacity(monsters.len());
        for monster in monsters {
            if snapshots.insert(monster.id, monster.clone()).is_none() {
                order.push(monster.id);
            }
        }
        Self { order, snapshots }
    }

    pub fn get(&self, monster_id: MonsterId) -> Option<&Monster> {
        self.snapshots.get(&monster_id)
    }

    /// Current name, if the monster is tracked.
    pub fn display_name(&self, monster_id: MonsterId) -> Option<&str> {
        self.get(monster_id).map(|m| m.name.as_str())
    }

    /// Merge a service patch into the snapshot and return the result.
    pub fn apply(&mut self, monster_id: MonsterId, patch: &MonsterPatch) -> Option<&Monster> {
        let snapshot = self.snapshots.get_mut(&monster_id)?;
        snapshot.apply(patch);
        Some(snapshot)
    }

    /// Force the name after a rename, whatever the service echoed.
    pub fn rename(&mut self, monster_id: MonsterId, new_name: &str) -> Option<&Monster> {
        let snapshot = self.snapshots.get_mut(&monster_id)?;
        snapshot.name = new_name.to_string();
        Some(snapshot)
    }

    /// Snapshots in seed order.
    pub fn snapshots(&self) -> Vec<Monster> {
        self.order
            .iter()
            .filter_map(|id| self.snapshots.get(id).cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> SnapshotTracker {
        SnapshotTracker::new(&[
            Monster::new(MonsterId::new(1), "Alpha", "Pikachu").with_types(&["Electric"]),
            Monster::new(MonsterId::new(2), "Beta", "Eevee"),
        ])
    }

    #[test]
    fn patches_merge_into_snapshot() {
        let mut tracker = tracker();
        let patch = MonsterPatch {
            type2: Some(Some("Fire".to_string())),
            ..MonsterPatch::default()
        };

        let after = tracker.apply(MonsterId::new(1), &patch).unwrap().clone();

        assert_eq!(after.types(), vec!["Electric", "Fire"]);
        assert_eq!(after.name, "Alpha");
        assert_eq!(tracker.get(MonsterId::new(1)), Some(&after));
    }

    #[test]
    fn rename_overrides_name() {
        let mut tracker = tracker();
        tracker.rename(MonsterId::new(2), "Sparky");
        assert_eq!(tracker.display_name(MonsterId::new(2)), Some("Sparky"));
    }

    #[test]
    fn unknown_monster_is_ignored() {
        let mut tracker = tracker();
        assert!(tracker
            .apply(MonsterId::new(9), &MonsterPatch::renamed("X"))
            .is_none());
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn snapshots_keep_seed_order() {
        let names: Vec<String> = tracker().snapshots().into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["Alpha", "Beta"]);
    }
}
