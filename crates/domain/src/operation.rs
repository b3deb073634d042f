//! Typed mutations collected from a mass-edit batch.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{ItemCategory, MonsterId};

/// Stable identifier of an operation within a batch.
///
/// Derived from monster id, kind and selection index, so rebuilding the same
/// intent produces the same ids.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(String);

impl OperationId {
    pub fn rename(monster_id: MonsterId) -> Self {
        Self(format!("{monster_id}-rename"))
    }

    pub fn pastry(monster_id: MonsterId, index: usize) -> Self {
        Self(format!("{monster_id}-pastry-{index}"))
    }

    pub fn berry(monster_id: MonsterId, index: usize) -> Self {
        Self(format!("{monster_id}-berry-{index}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OperationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for OperationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// What an operation does to its monster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OperationKind {
    Rename { new_name: String },
    Pastry { pastry_type: String, value: String },
    Berry { berry_type: String },
}

/// One immutable unit of work in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub id: OperationId,
    pub monster_id: MonsterId,
    /// Display name of the monster when the batch was built
    pub monster_name: String,
    #[serde(flatten)]
    pub kind: OperationKind,
}

impl Operation {
    pub fn rename(
        monster_id: MonsterId,
        monster_name: impl Into<String>,
        new_name: impl Into<String>,
    ) -> Self {
        Self {
            id: OperationId::rename(monster_id),
            monster_id,
            monster_name: monster_name.into(),
            kind: OperationKind::Rename {
                new_name: new_name.into(),
            },
        }
    }

    pub fn pastry(
        monster_id: MonsterId,
        monster_name: impl Into<String>,
        index: usize,
        pastry_type: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            id: OperationId::pastry(monster_id, index),
            monster_id,
            monster_name: monster_name.into(),
            kind: OperationKind::Pastry {
                pastry_type: pastry_type.into(),
                value: value.into(),
            },
        }
    }

    pub fn berry(
        monster_id: MonsterId,
        monster_name: impl Into<String>,
        index: usize,
        berry_type: impl Into<String>,
    ) -> Self {
        Self {
            id: OperationId::berry(monster_id, index),
            monster_id,
            monster_name: monster_name.into(),
            kind: OperationKind::Berry {
                berry_type: berry_type.into(),
            },
        }
    }

    /// Inventory category this operation spends, if any.
    pub fn category(&self) -> Option<ItemCategory> {
        match &self.kind {
            OperationKind::Rename { .. } => None,
            OperationKind::Pastry { .. } => Some(ItemCategory::Pastry),
            OperationKind::Berry { .. } => Some(ItemCategory::Berry),
        }
    }

    /// Inventory item this operation spends, if any.
    pub fn item_type(&self) -> Option<&str> {
        match &self.kind {
            OperationKind::Rename { .. } => None,
            OperationKind::Pastry { pastry_type, .. } => Some(pastry_type),
            OperationKind::Berry { berry_type } => Some(berry_type),
        }
    }

    pub fn berry_type(&self) -> Option<&str> {
        match &self.kind {
            OperationKind::Berry { berry_type } => Some(berry_type),
            _ => None,
        }
    }

    pub fn is_rename(&self) -> bool {
        matches!(self.kind, OperationKind::Rename { .. })
    }

    pub fn is_pastry(&self) -> bool {
        matches!(self.kind, OperationKind::Pastry { .. })
    }

    pub fn is_berry(&self) -> bool {
        matches!(self.kind, OperationKind::Berry { .. })
    }
}
