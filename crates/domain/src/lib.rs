//! TrainerHub domain types.
//!
//! Pure data and pure rules for the mass-edit pipeline: monster snapshots,
//! inventory counts, batch operations and their results. No I/O lives here.

extern crate self as trainerhub_domain;

pub mod ids;
pub mod inventory;
pub mod item_rules;
pub mod monster;
pub mod operation;
pub mod result;

pub use ids::{BatchId, MonsterId, TrainerId};
pub use inventory::{InventoryLedger, ItemCategory};
pub use item_rules::{ItemRules, PastryValueKind, SpeciesSlot, StandardItemRules, DIVEST_BERRY};
pub use monster::{Monster, MonsterPatch, MAX_SPECIES_SLOTS, MAX_TYPE_SLOTS};
pub use operation::{Operation, OperationId, OperationKind};
pub use result::{
    AppliedChange, BatchSummary, ChangeCategory, OperationOutcome, OperationResult, ResultStatus,
};
