//! Consumable item counts for one trainer.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The two consumable categories the mass editor spends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    Berry,
    Pastry,
}

impl fmt::Display for ItemCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemCategory::Berry => write!(f, "berry"),
            ItemCategory::Pastry => write!(f, "pastry"),
        }
    }
}

/// Working copy of a trainer's berry and pastry counts.
///
/// Counts are unsigned and only ever decremented with saturation, so a
/// ledger can never hold a negative count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryLedger {
    #[serde(default)]
    pub berries: BTreeMap<String, u32>,
    #[serde(default)]
    pub pastries: BTreeMap<String, u32>,
}

impl InventoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_berry(mut self, name: impl Into<String>, count: u32) -> Self {
        self.berries.insert(name.into(), count);
        self
    }

    pub fn with_pastry(mut self, name: impl Into<String>, count: u32) -> Self {
        self.pastries.insert(name.into(), count);
        self
    }

    pub fn items(&self, category: ItemCategory) -> &BTreeMap<String, u32> {
        match category {
            ItemCategory::Berry => &self.berries,
            ItemCategory::Pastry => &self.pastries,
        }
    }

    fn items_mut(&mut self, category: ItemCategory) -> &mut BTreeMap<String, u32> {
        match category {
            ItemCategory::Berry => &mut self.berries,
            ItemCategory::Pastry => &mut self.pastries,
        }
    }

    /// Count for an item type; unknown types have zero.
    pub fn count(&self, category: ItemCategory, item: &str) -> u32 {
        self.items(category).get(item).copied().unwrap_or(0)
    }

    pub fn holds(&self, category: ItemCategory, item: &str) -> bool {
        self.items(category).contains_key(item)
    }

    /// Spend one unit, clamped at zero. Returns the count after the decrement.
    ///
    /// Item types the ledger never held are left absent.
    pub fn decrement(&mut self, category: ItemCategory, item: &str) -> u32 {
        match self.items_mut(category).get_mut(item) {
            Some(count) => {
                *count = count.saturating_sub(1);
                *count
            }
            None => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.berries.values().all(|c| *c == 0) && self.pastries.values().all(|c| *c == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decrement_clamps_at_zero() {
        let mut ledger = InventoryLedger::new().with_berry("Oran Berry", 1);

        assert_eq!(ledger.decrement(ItemCategory::Berry, "Oran Berry"), 0);
        assert_eq!(ledger.decrement(ItemCategory::Berry, "Oran Berry"), 0);
        assert_eq!(ledger.count(ItemCategory::Berry, "Oran Berry"), 0);
    }

    #[test]
    fn decrement_of_unknown_item_does_not_insert_it() {
        let mut ledger = InventoryLedger::new();
        ledger.decrement(ItemCategory::Pastry, "Miraca Pastry");
        assert!(!ledger.holds(ItemCategory::Pastry, "Miraca Pastry"));
    }

    #[test]
    fn categories_are_independent() {
        let ledger = InventoryLedger::new()
            .with_berry("Patama Berry", 2)
            .with_pastry("Patama Pastry", 5);
        assert_eq!(ledger.count(ItemCategory::Berry, "Patama Berry"), 2);
        assert_eq!(ledger.count(ItemCategory::Pastry, "Patama Pastry"), 5);
        assert_eq!(ledger.count(ItemCategory::Berry, "Patama Pastry"), 0);
    }

    #[test]
    fn missing_maps_deserialize_as_empty() {
        let ledger: InventoryLedger = serde_json::from_str(r#"{"berries":{"Oran Berry":3}}"#).unwrap();
        assert_eq!(ledger.count(ItemCategory::Berry, "Oran Berry"), 3);
        assert!(ledger.pastries.is_empty());
    }
}
