//! Mass-edit session state machine.
//!
//! A session moves `Edit -> Processing -> [SpeciesSelection -> Processing]
//! -> Results`. Only `Edit` accepts intent changes. Every transition checks
//! the current state first and leaves it untouched when called from the
//! wrong one.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trainerhub_domain::{
    BatchId, InventoryLedger, Monster, Operation, OperationId, OperationResult, TrainerId,
};

use crate::infrastructure::ports::{ClockPort, InventoryPort};

use super::aggregate::{reconcile, BatchReport};
use super::builder::BatchDraft;
use super::error::MassEditError;
use super::executor::PhasedExecutor;
use super::snapshot::SnapshotTracker;
use super::species::{RollOutcome, SpeciesResolver};
use super::types::SpeciesSelectionRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Edit,
    Processing,
    SpeciesSelection,
    Results,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Edit => write!(f, "edit"),
            SessionPhase::Processing => write!(f, "processing"),
            SessionPhase::SpeciesSelection => write!(f, "species_selection"),
            SessionPhase::Results => write!(f, "results"),
        }
    }
}

/// A run parked while the user picks species.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuspendedBatch {
    pub request: SpeciesSelectionRequest,
    /// Results of the immediate phases; these mutations already happened
    pub completed: Vec<OperationResult>,
    pub tracker: SnapshotTracker,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MassEditState {
    Edit(BatchDraft),
    Processing,
    SpeciesSelection(Box<SuspendedBatch>),
    Results(BatchReport),
}

impl MassEditState {
    pub fn phase(&self) -> SessionPhase {
        match self {
            MassEditState::Edit(_) => SessionPhase::Edit,
            MassEditState::Processing => SessionPhase::Processing,
            MassEditState::SpeciesSelection(_) => SessionPhase::SpeciesSelection,
            MassEditState::Results(_) => SessionPhase::Results,
        }
    }
}

/// One trainer's mass-edit batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MassEditSession {
    id: BatchId,
    trainer_id: TrainerId,
    /// Working inventory. Reconciled once when a run finishes or is cancelled.
    ledger: InventoryLedger,
    state: MassEditState,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl MassEditSession {
    pub fn new(
        trainer_id: TrainerId,
        monsters: Vec<Monster>,
        ledger: InventoryLedger,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: BatchId::new(),
            trainer_id,
            ledger,
            state: MassEditState::Edit(BatchDraft::new(monsters)),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> BatchId {
        self.id
    }

    pub fn trainer_id(&self) -> TrainerId {
        self.trainer_id
    }

    pub fn ledger(&self) -> &InventoryLedger {
        &self.ledger
    }

    pub fn state(&self) -> &MassEditState {
        &self.state
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.phase()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Latest known monster snapshots for the current state.
    pub fn monsters(&self) -> Vec<Monster> {
        match &self.state {
            MassEditState::Edit(draft) => draft.monsters().to_vec(),
            MassEditState::SpeciesSelection(suspended) => suspended.tracker.snapshots(),
            MassEditState::Results(report) => report.monsters.clone(),
            MassEditState::Processing => Vec::new(),
        }
    }

    fn expect(&self, expected: SessionPhase) -> Result<(), MassEditError> {
        let actual = self.phase();
        if actual == expected {
            Ok(())
        } else {
            Err(MassEditError::invalid_state(expected, actual))
        }
    }

    pub fn draft(&self) -> Result<&BatchDraft, MassEditError> {
        match &self.state {
            MassEditState::Edit(draft) => Ok(draft),
            other => Err(MassEditError::invalid_state(
                SessionPhase::Edit,
                other.phase(),
            )),
        }
    }

    /// Mutable draft; intent edits are only allowed in `Edit`.
    pub fn draft_mut(&mut self) -> Result<&mut BatchDraft, MassEditError> {
        match &mut self.state {
            MassEditState::Edit(draft) => Ok(draft),
            other => Err(MassEditError::invalid_state(
                SessionPhase::Edit,
                other.phase(),
            )),
        }
    }

    pub fn selection(&self) -> Result<&SpeciesSelectionRequest, MassEditError> {
        match &self.state {
            MassEditState::SpeciesSelection(suspended) => Ok(&suspended.request),
            other => Err(MassEditError::invalid_state(
                SessionPhase::SpeciesSelection,
                other.phase(),
            )),
        }
    }

    pub fn report(&self) -> Result<&BatchReport, MassEditError> {
        match &self.state {
            MassEditState::Results(report) => Ok(report),
            other => Err(MassEditError::invalid_state(
                SessionPhase::Results,
                other.phase(),
            )),
        }
    }

    /// Record a species pick for one pending operation.
    pub fn resolve_species(
        &mut self,
        operation_id: &OperationId,
        species: &str,
        now: DateTime<Utc>,
    ) -> Result<(), MassEditError> {
        match &mut self.state {
            MassEditState::SpeciesSelection(suspended) => {
                suspended.request.select(operation_id, species)?;
                self.updated_at = now;
                Ok(())
            }
            other => Err(MassEditError::invalid_state(
                SessionPhase::SpeciesSelection,
                other.phase(),
            )),
        }
    }

    /// Abandon the pending species berries and go back to editing.
    ///
    /// The immediate-phase results already happened, so they are charged to
    /// the ledger before the new draft starts from the latest snapshots.
    pub fn cancel_species_selection(&mut self, now: DateTime<Utc>) -> Result<(), MassEditError> {
        let suspended = self.take_suspended()?;

        self.ledger = reconcile(&self.ledger, &suspended.completed);
        self.state = MassEditState::Edit(BatchDraft::new(suspended.tracker.snapshots()));
        self.updated_at = now;

        tracing::info!(
            batch_id = %self.id,
            abandoned = suspended.request.pending.len(),
            retained = suspended.completed.len(),
            "Species selection cancelled"
        );
        Ok(())
    }

    // Moves the suspended run out, leaving `Processing` behind.
    fn take_suspended(&mut self) -> Result<Box<SuspendedBatch>, MassEditError> {
        match std::mem::replace(&mut self.state, MassEditState::Processing) {
            MassEditState::SpeciesSelection(suspended) => Ok(suspended),
            other => {
                let actual = other.phase();
                self.state = other;
                Err(MassEditError::invalid_state(
                    SessionPhase::SpeciesSelection,
                    actual,
                ))
            }
        }
    }

    /// Start a fresh batch from `Results`, keeping the reconciled ledger.
    pub fn start_new_batch(
        &mut self,
        monsters: Vec<Monster>,
        now: DateTime<Utc>,
    ) -> Result<(), MassEditError> {
        self.expect(SessionPhase::Results)?;
        BatchDraft::check_unique(&monsters)?;
        self.state = MassEditState::Edit(BatchDraft::new(monsters));
        self.updated_at = now;
        Ok(())
    }

    /// Build the batch and move from `Edit` to `Processing`.
    ///
    /// Validation failures leave the session in `Edit`.
    pub fn begin_run(&mut self, now: DateTime<Utc>) -> Result<PreparedRun, MassEditError> {
        let draft = self.draft()?;
        let operations = draft.build(&self.ledger)?;
        let tracker = SnapshotTracker::new(draft.monsters());

        self.state = MassEditState::Processing;
        self.updated_at = now;
        tracing::info!(
            batch_id = %self.id,
            operations = operations.len(),
            "Mass edit run started"
        );

        Ok(PreparedRun {
            batch_id: self.id,
            trainer_id: self.trainer_id,
            work: RunWork::Phases(operations),
            tracker,
        })
    }

    /// Move from `SpeciesSelection` to `Processing` with every pick made.
    ///
    /// A missing pick leaves the session in `SpeciesSelection`.
    pub fn begin_species_completion(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<PreparedRun, MassEditError> {
        let choices = self.selection()?.choices()?;
        let SuspendedBatch {
            completed, tracker, ..
        } = *self.take_suspended()?;
        self.updated_at = now;

        Ok(PreparedRun {
            batch_id: self.id,
            trainer_id: self.trainer_id,
            work: RunWork::SpeciesBerries { choices, completed },
            tracker,
        })
    }

    /// Record what an executed run produced. Only valid in `Processing`.
    pub fn settle(
        &mut self,
        progress: RunProgress,
        now: DateTime<Utc>,
    ) -> Result<RunOutcome, MassEditError> {
        self.expect(SessionPhase::Processing)?;
        match progress {
            RunProgress::Finished { results, tracker } => {
                Ok(RunOutcome::Completed(self.finish(results, &tracker, now)))
            }
            RunProgress::Suspended(suspended) => {
                let request = suspended.request.clone();
                self.state = MassEditState::SpeciesSelection(suspended);
                self.updated_at = now;
                Ok(RunOutcome::SpeciesSelection(request))
            }
        }
    }

    fn finish(
        &mut self,
        results: Vec<OperationResult>,
        tracker: &SnapshotTracker,
        now: DateTime<Utc>,
    ) -> BatchReport {
        let report = BatchReport::new(results, &self.ledger, tracker.snapshots());
        self.ledger = report.inventory.clone();
        self.state = MassEditState::Results(report.clone());
        self.updated_at = now;

        tracing::info!(
            batch_id = %self.id,
            trainer_id = %self.trainer_id,
            success_count = report.summary.success_count,
            error_count = report.summary.error_count,
            "Mass edit batch finished"
        );
        report
    }
}

/// Work taken out of a session so it can execute without holding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedRun {
    batch_id: BatchId,
    trainer_id: TrainerId,
    work: RunWork,
    tracker: SnapshotTracker,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum RunWork {
    /// Phases 1 to 3, then species rolls if any berry needs a pick
    Phases(Vec<Operation>),
    /// Phase 4 with the user's picks
    SpeciesBerries {
        choices: Vec<(Operation, String)>,
        completed: Vec<OperationResult>,
    },
}

/// What executing a `PreparedRun` produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunProgress {
    Finished {
        results: Vec<OperationResult>,
        tracker: SnapshotTracker,
    },
    Suspended(Box<SuspendedBatch>),
}

/// What a run left the session waiting on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(BatchReport),
    SpeciesSelection(SpeciesSelectionRequest),
}

/// Use case driving sessions through their transitions.
///
/// Runs are split into prepare, execute and settle so a caller can release
/// the session while the service calls are in flight.
pub struct MassEdit {
    inventory: Arc<dyn InventoryPort>,
    executor: Arc<PhasedExecutor>,
    resolver: Arc<SpeciesResolver>,
    clock: Arc<dyn ClockPort>,
}

impl MassEdit {
    pub fn new(
        inventory: Arc<dyn InventoryPort>,
        executor: Arc<PhasedExecutor>,
        resolver: Arc<SpeciesResolver>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            inventory,
            executor,
            resolver,
            clock,
        }
    }

    /// Open a session in `Edit`. An unreachable inventory service opens it
    /// with an empty ledger.
    pub async fn open(
        &self,
        trainer_id: TrainerId,
        monsters: Vec<Monster>,
    ) -> Result<MassEditSession, MassEditError> {
        BatchDraft::check_unique(&monsters)?;

        let ledger = match self.inventory.get_inventory(trainer_id).await {
            Ok(ledger) => ledger,
            Err(e) => {
                tracing::warn!(
                    trainer_id = %trainer_id,
                    error = %e,
                    "Failed to load inventory, opening mass edit with an empty ledger"
                );
                InventoryLedger::default()
            }
        };

        let session = MassEditSession::new(trainer_id, monsters, ledger, self.clock.now());
        tracing::info!(
            batch_id = %session.id(),
            trainer_id = %trainer_id,
            "Mass edit session opened"
        );
        Ok(session)
    }

    /// Reload the ledger from the inventory service. Only valid in `Edit`.
    pub async fn refresh_inventory(
        &self,
        session: &mut MassEditSession,
    ) -> Result<(), MassEditError> {
        session.expect(SessionPhase::Edit)?;
        let ledger = self.inventory.get_inventory(session.trainer_id).await?;
        session.ledger = ledger;
        session.updated_at = self.clock.now();
        Ok(())
    }

    pub fn prepare_run(&self, session: &mut MassEditSession) -> Result<PreparedRun, MassEditError> {
        session.begin_run(self.clock.now())
    }

    pub fn prepare_species_completion(
        &self,
        session: &mut MassEditSession,
    ) -> Result<PreparedRun, MassEditError> {
        session.begin_species_completion(self.clock.now())
    }

    /// Make the service calls for a prepared run.
    ///
    /// Species berries from the immediate phases are rolled and suspend the
    /// run; a failed or empty roll finishes it with error results instead.
    pub async fn execute(&self, prepared: PreparedRun) -> RunProgress {
        let PreparedRun {
            batch_id,
            trainer_id,
            work,
            mut tracker,
        } = prepared;

        match work {
            RunWork::Phases(operations) => {
                let run = self
                    .executor
                    .run_phases(trainer_id, operations, &mut tracker)
                    .await;
                if run.deferred.is_empty() {
                    return RunProgress::Finished {
                        results: run.results,
                        tracker,
                    };
                }

                tracing::info!(
                    batch_id = %batch_id,
                    deferred = run.deferred.len(),
                    "Rolling species for deferred berries"
                );
                match self.resolver.roll(run.deferred).await {
                    RollOutcome::Ready(request) => RunProgress::Suspended(Box::new(SuspendedBatch {
                        request,
                        completed: run.results,
                        tracker,
                    })),
                    RollOutcome::Failed(errors) => {
                        let mut results = run.results;
                        results.extend(errors);
                        RunProgress::Finished { results, tracker }
                    }
                }
            }
            RunWork::SpeciesBerries { choices, completed } => {
                let species_results = self
                    .executor
                    .run_species_berries(trainer_id, choices, &mut tracker)
                    .await;
                let mut results = completed;
                results.extend(species_results);
                RunProgress::Finished { results, tracker }
            }
        }
    }

    pub fn settle(
        &self,
        session: &mut MassEditSession,
        progress: RunProgress,
    ) -> Result<RunOutcome, MassEditError> {
        session.settle(progress, self.clock.now())
    }

    /// Build the batch and run the immediate phases.
    ///
    /// Validation failures leave the session in `Edit`. Species berries park
    /// the session in `SpeciesSelection`; otherwise it ends in `Results`.
    pub async fn run(&self, session: &mut MassEditSession) -> Result<RunOutcome, MassEditError> {
        let prepared = self.prepare_run(session)?;
        let progress = self.execute(prepared).await;
        self.settle(session, progress)
    }

    pub fn resolve_species(
        &self,
        session: &mut MassEditSession,
        operation_id: &OperationId,
        species: &str,
    ) -> Result<(), MassEditError> {
        session.resolve_species(operation_id, species, self.clock.now())
    }

    /// Run the species berries with their picks and finish the batch.
    ///
    /// Requires a pick for every pending operation; otherwise the session
    /// stays in `SpeciesSelection`.
    pub async fn complete_species_selection(
        &self,
        session: &mut MassEditSession,
    ) -> Result<RunOutcome, MassEditError> {
        let prepared = self.prepare_species_completion(session)?;
        let progress = self.execute(prepared).await;
        self.settle(session, progress)
    }

    pub fn cancel_species_selection(
        &self,
        session: &mut MassEditSession,
    ) -> Result<(), MassEditError> {
        session.cancel_species_selection(self.clock.now())
    }

    pub fn start_new_batch(
        &self,
        session: &mut MassEditSession,
        monsters: Vec<Monster>,
    ) -> Result<(), MassEditError> {
        session.start_new_batch(monsters, self.clock.now())
    }
}
