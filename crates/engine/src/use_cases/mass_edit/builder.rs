//! Operation builder.
//!
//! Holds the per-monster edit intent for a batch, answers which items are
//! still selectable for a slot, and flattens the intent into operations.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use trainerhub_domain::{
    InventoryLedger, ItemCategory, ItemRules, Monster, MonsterId, Operation,
};

use super::error::BuildError;
use super::types::{ItemAvailability, MonsterEditIntent, PastrySelection};

/// Edit intent for every monster in a batch, in presentation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchDraft {
    monsters: Vec<Monster>,
    intents: HashMap<MonsterId, MonsterEditIntent>,
}

impl BatchDraft {
    /// Draft for `monsters`. A repeated id keeps its first occurrence so
    /// every operation id stays unique.
    pub fn new(monsters: Vec<Monster>) -> Self {
        let mut intents = HashMap::with_capacity(monsters.len());
        let monsters = monsters
            .into_iter()
            .filter(|monster| {
                let fresh = !intents.contains_key(&monster.id);
                if fresh {
                    intents.insert(monster.id, MonsterEditIntent::for_monster(monster));
                }
                fresh
            })
            .collect();
        Self { monsters, intents }
    }

    /// Reject a monster list that names the same monster twice.
    pub fn check_unique(monsters: &[Monster]) -> Result<(), BuildError> {
        let mut seen = HashSet::with_capacity(monsters.len());
        match monsters.iter().find(|monster| !seen.insert(monster.id)) {
            Some(duplicate) => Err(BuildError::DuplicateMonster(duplicate.id)),
            None => Ok(()),
        }
    }

    pub fn monsters(&self) -> &[Monster] {
        &self.monsters
    }

    pub fn monster(&self, monster_id: MonsterId) -> Option<&Monster> {
        self.monsters.iter().find(|m| m.id == monster_id)
    }

    pub fn intent(&self, monster_id: MonsterId) -> Option<&MonsterEditIntent> {
        self.intents.get(&monster_id)
    }

    fn intent_mut(&mut self, monster_id: MonsterId) -> Result<&mut MonsterEditIntent, BuildError> {
        self.intents
            .get_mut(&monster_id)
            .ok_or(BuildError::UnknownMonster(monster_id))
    }

    /// Replace a monster's whole intent.
    pub fn set_intent(
        &mut self,
        monster_id: MonsterId,
        mut intent: MonsterEditIntent,
    ) -> Result<(), BuildError> {
        if intent.berries.is_empty() {
            intent.berries.push(String::new());
        }
        if intent.pastries.is_empty() {
            intent.pastries.push(PastrySelection::default());
        }
        *self.intent_mut(monster_id)? = intent;
        Ok(())
    }

    pub fn set_nickname(
        &mut self,
        monster_id: MonsterId,
        nickname: impl Into<String>,
    ) -> Result<(), BuildError> {
        self.intent_mut(monster_id)?.nickname = nickname.into();
        Ok(())
    }

    pub fn set_berry(
        &mut self,
        monster_id: MonsterId,
        index: usize,
        berry_type: impl Into<String>,
    ) -> Result<(), BuildError> {
        let slot = self
            .intent_mut(monster_id)?
            .berries
            .get_mut(index)
            .ok_or(BuildError::UnknownSlot {
                monster_id,
                category: ItemCategory::Berry,
                index,
            })?;
        *slot = berry_type.into();
        Ok(())
    }

    pub fn add_berry_slot(&mut self, monster_id: MonsterId) -> Result<usize, BuildError> {
        let berries = &mut self.intent_mut(monster_id)?.berries;
        berries.push(String::new());
        Ok(berries.len() - 1)
    }

    pub fn remove_berry_slot(&mut self, monster_id: MonsterId, index: usize) -> Result<(), BuildError> {
        let berries = &mut self.intent_mut(monster_id)?.berries;
        if index >= berries.len() {
            return Err(BuildError::UnknownSlot {
                monster_id,
                category: ItemCategory::Berry,
                index,
            });
        }
        if berries.len() == 1 {
            return Err(BuildError::LastSlot {
                monster_id,
                category: ItemCategory::Berry,
            });
        }
        berries.remove(index);
        Ok(())
    }

    fn pastry_slot(
        &mut self,
        monster_id: MonsterId,
        index: usize,
    ) -> Result<&mut PastrySelection, BuildError> {
        self.intent_mut(monster_id)?
            .pastries
            .get_mut(index)
            .ok_or(BuildError::UnknownSlot {
                monster_id,
                category: ItemCategory::Pastry,
                index,
            })
    }

    pub fn set_pastry_type(
        &mut self,
        monster_id: MonsterId,
        index: usize,
        pastry_type: impl Into<String>,
    ) -> Result<(), BuildError> {
        self.pastry_slot(monster_id, index)?.pastry_type = pastry_type.into();
        Ok(())
    }

    pub fn set_pastry_value(
        &mut self,
        monster_id: MonsterId,
        index: usize,
        value: impl Into<String>,
    ) -> Result<(), BuildError> {
        self.pastry_slot(monster_id, index)?.value = value.into();
        Ok(())
    }

    pub fn add_pastry_slot(&mut self, monster_id: MonsterId) -> Result<usize, BuildError> {
        let pastries = &mut self.intent_mut(monster_id)?.pastries;
        pastries.push(PastrySelection::default());
        Ok(pastries.len() - 1)
    }

    pub fn remove_pastry_slot(&mut self, monster_id: MonsterId, index: usize) -> Result<(), BuildError> {
        let pastries = &mut self.intent_mut(monster_id)?.pastries;
        if index >= pastries.len() {
            return Err(BuildError::UnknownSlot {
                monster_id,
                category: ItemCategory::Pastry,
                index,
            });
        }
        if pastries.len() == 1 {
            return Err(BuildError::LastSlot {
                monster_id,
                category: ItemCategory::Pastry,
            });
        }
        pastries.remove(index);
        Ok(())
    }

    // =========================================================================
    // Availability
    // =========================================================================

    /// Units of `item` claimed by selections across the whole batch, except
    /// the slot `skip` (the slot being rendered must not block itself).
    pub fn reserved(
        &self,
        category: ItemCategory,
        item: &str,
        skip: Option<(MonsterId, usize)>,
    ) -> u32 {
        let mut total = 0u32;
        for (monster_id, intent) in &self.intents {
            let selections: Vec<&str> = match category {
                ItemCategory::Berry => intent.berries.iter().map(|b| b.trim()).collect(),
                ItemCategory::Pastry => intent
                    .pastries
                    .iter()
                    .map(|p| p.pastry_type.trim())
                    .collect(),
            };
            for (index, selected) in selections.into_iter().enumerate() {
                if skip == Some((*monster_id, index)) {
                    continue;
                }
                if selected == item {
                    total = total.saturating_add(1);
                }
            }
        }
        total
    }

    /// Berries selectable for berry slot `index` of a monster.
    pub fn available_berries(
        &self,
        ledger: &InventoryLedger,
        rules: &dyn ItemRules,
        monster_id: MonsterId,
        index: usize,
    ) -> Result<Vec<ItemAvailability>, BuildError> {
        let monster = self
            .monster(monster_id)
            .ok_or(BuildError::UnknownMonster(monster_id))?;
        Ok(self.available(ledger, ItemCategory::Berry, monster_id, index, |berry| {
            rules.can_berry_affect(berry, monster)
        }))
    }

    /// Pastries selectable for pastry slot `index` of a monster.
    pub fn available_pastries(
        &self,
        ledger: &InventoryLedger,
        rules: &dyn ItemRules,
        monster_id: MonsterId,
        index: usize,
    ) -> Result<Vec<ItemAvailability>, BuildError> {
        let monster = self
            .monster(monster_id)
            .ok_or(BuildError::UnknownMonster(monster_id))?;
        Ok(self.available(ledger, ItemCategory::Pastry, monster_id, index, |pastry| {
            rules.can_pastry_affect(pastry, monster)
        }))
    }

    fn available(
        &self,
        ledger: &InventoryLedger,
        category: ItemCategory,
        monster_id: MonsterId,
        index: usize,
        can_affect: impl Fn(&str) -> bool,
    ) -> Vec<ItemAvailability> {
        ledger
            .items(category)
            .iter()
            .filter(|(_, count)| **count > 0)
            .filter_map(|(item, count)| {
                let reserved = self.reserved(category, item, Some((monster_id, index)));
                let remaining = count.saturating_sub(reserved);
                (remaining > 0 && can_affect(item)).then(|| ItemAvailability {
                    item: item.clone(),
                    remaining,
                })
            })
            .collect()
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Flatten the intent into operations without checking inventory.
    ///
    /// Monsters in presentation order; per monster pastries, then berries,
    /// then the rename. Unfilled or half-filled selections are skipped.
    pub fn operations(&self) -> Vec<Operation> {
        let mut operations = Vec::new();
        for monster in &self.monsters {
            let Some(intent) = self.intents.get(&monster.id) else {
                continue;
            };

            for (index, pastry) in intent.pastries.iter().enumerate() {
                if pastry.is_complete() {
                    operations.push(Operation::pastry(
                        monster.id,
                        &monster.name,
                        index,
                        pastry.pastry_type.trim(),
                        pastry.value.trim(),
                    ));
                } else if !pastry.pastry_type.trim().is_empty() || !pastry.value.trim().is_empty() {
                    tracing::debug!(
                        monster_id = %monster.id,
                        index,
                        "Skipping incomplete pastry selection"
                    );
                }
            }

            for (index, berry) in intent.berries.iter().enumerate() {
                let berry = berry.trim();
                if !berry.is_empty() {
                    operations.push(Operation::berry(monster.id, &monster.name, index, berry));
                }
            }

            let nickname = intent.nickname.trim();
            if !nickname.is_empty() && nickname != monster.name {
                operations.push(Operation::rename(monster.id, &monster.name, nickname));
            }
        }
        operations
    }

    /// Flatten the intent into operations, rejecting selections the
    /// inventory cannot cover.
    pub fn build(&self, ledger: &InventoryLedger) -> Result<Vec<Operation>, BuildError> {
        let operations = self.operations();

        let mut demand: BTreeMap<(ItemCategory, &str), u32> = BTreeMap::new();
        for operation in &operations {
            if let (Some(category), Some(item)) = (operation.category(), operation.item_type()) {
                *demand.entry((category, item)).or_default() += 1;
            }
        }

        for ((category, item), requested) in demand {
            if !ledger.holds(category, item) {
                return Err(BuildError::UnknownItem {
                    category,
                    item: item.to_string(),
                });
            }
            let available = ledger.count(category, item);
            if requested > available {
                return Err(BuildError::InsufficientInventory {
                    item: item.to_string(),
                    requested,
                    available,
                });
            }
        }

        Ok(operations)
    }
}
