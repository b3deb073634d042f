//! Edit intent and view types for the mass editor.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use trainerhub_domain::{Monster, Operation, OperationId};

/// One pastry selection: the pastry and the value it sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PastrySelection {
    #[serde(default)]
    pub pastry_type: String,
    #[serde(default)]
    pub value: String,
}

impl PastrySelection {
    pub fn new(pastry_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            pastry_type: pastry_type.into(),
            value: value.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.pastry_type.trim().is_empty() && !self.value.trim().is_empty()
    }
}

/// What the user wants done to one monster.
///
/// Empty strings are unfilled slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonsterEditIntent {
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub berries: Vec<String>,
    #[serde(default)]
    pub pastries: Vec<PastrySelection>,
}

impl MonsterEditIntent {
    /// Fresh intent: current name pre-filled, one empty slot of each kind.
    pub fn for_monster(monster: &Monster) -> Self {
        Self {
            nickname: monster.name.clone(),
            berries: vec![String::new()],
            pastries: vec![PastrySelection::default()],
        }
    }
}

/// An item the user may pick for one selection slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAvailability {
    pub item: String,
    /// Units left for this slot, counting the slot's own current choice
    pub remaining: u32,
}

/// A berry operation waiting for the user to pick a species.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSpeciesSelection {
    pub operation: Operation,
    /// Candidates in roll order
    pub candidates: Vec<String>,
    pub selected: Option<String>,
}

impl PendingSpeciesSelection {
    pub fn new(operation: Operation, candidates: Vec<String>) -> Self {
        Self {
            operation,
            candidates,
            selected: None,
        }
    }

    pub fn operation_id(&self) -> &OperationId {
        &self.operation.id
    }
}

/// Everything the UI needs to render the species picker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesSelectionRequest {
    pub pending: Vec<PendingSpeciesSelection>,
    /// Image reference per rolled species; species without images are absent
    pub images: BTreeMap<String, String>,
}
