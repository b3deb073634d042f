//! Mass-edit use cases.
//!
//! Applies a batch of renames, pastries and berries to a trainer's monsters
//! against a shared inventory. Data flows builder -> executor -> (species
//! resolution) -> aggregator, with the snapshot tracker threaded through.

mod aggregate;
mod builder;
mod error;
mod executor;
mod session;
mod snapshot;
mod species;
mod types;

use std::sync::Arc;

pub use aggregate::{reconcile, BatchReport};
pub use builder::BatchDraft;
pub use error::{BuildError, MassEditError, SelectionError};
pub use executor::{ExecutionPhase, PhaseRun, PhasedExecutor};
pub use session::{
    MassEdit, MassEditSession, MassEditState, PreparedRun, RunOutcome, RunProgress, SessionPhase,
    SuspendedBatch,
};
pub use snapshot::SnapshotTracker;
pub use species::{RollOutcome, SpeciesResolver};
pub use types::{
    ItemAvailability, MonsterEditIntent, PastrySelection, PendingSpeciesSelection,
    SpeciesSelectionRequest,
};

/// Container for mass-edit use cases.
pub struct MassEditUseCases {
    pub mass_edit: Arc<MassEdit>,
}

impl MassEditUseCases {
    pub fn new(mass_edit: Arc<MassEdit>) -> Self {
        Self { mass_edit }
    }
}
