//! Mass-edit errors.

use trainerhub_domain::{ItemCategory, MonsterId, OperationId};

use crate::infrastructure::ports::ServiceError;

use super::session::SessionPhase;

/// Rejected edit intent. Raised before any mutation call is made.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("Monster {0} is not part of this batch")]
    UnknownMonster(MonsterId),
    #[error("Monster {0} appears more than once in this batch")]
    DuplicateMonster(MonsterId),
    #[error("Trainer has no {category} named {item}")]
    UnknownItem { category: ItemCategory, item: String },
    #[error("Selected {requested} x {item} but only {available} available")]
    InsufficientInventory {
        item: String,
        requested: u32,
        available: u32,
    },
    #[error("No {category} slot {index} on monster {monster_id}")]
    UnknownSlot {
        monster_id: MonsterId,
        category: ItemCategory,
        index: usize,
    },
    #[error("Monster {monster_id} must keep at least one {category} slot")]
    LastSlot {
        monster_id: MonsterId,
        category: ItemCategory,
    },
}

/// Rejected species choice.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("No pending species selection for operation {0}")]
    UnknownOperation(OperationId),
    #[error("{species} was not rolled for operation {operation_id}")]
    SpeciesNotRolled {
        operation_id: OperationId,
        species: String,
    },
    #[error("Species not selected for {} operation(s)", missing.len())]
    Incomplete { missing: Vec<OperationId> },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MassEditError {
    #[error("Batch is in {actual} state, expected {expected}")]
    InvalidState {
        expected: SessionPhase,
        actual: SessionPhase,
    },
    #[error("Invalid edit: {0}")]
    Build(#[from] BuildError),
    #[error("Invalid species selection: {0}")]
    Selection(#[from] SelectionError),
    #[error("Inventory unavailable: {0}")]
    Inventory(#[from] ServiceError),
}

impl MassEditError {
    pub fn invalid_state(expected: SessionPhase, actual: SessionPhase) -> Self {
        Self::InvalidState { expected, actual }
    }
}
