//! Phased executor.
//!
//! Runs a batch's operations against the mutation service in a fixed phase
//! order, one call at a time, threading the snapshot tracker through every
//! step. A failed call becomes an error result and the batch moves on; there
//! is no retry and no compensation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use trainerhub_domain::{
    AppliedChange, ChangeCategory, ItemRules, Monster, MonsterPatch, Operation, OperationKind,
    OperationResult, TrainerId, DIVEST_BERRY,
};

use crate::infrastructure::ports::{
    BerryOutcome, BerryRequest, MonsterMutationPort, MutationOutcome, PastryRequest, ServiceError,
};

use super::snapshot::SnapshotTracker;

/// Execution phases in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPhase {
    Rename,
    Pastry,
    Berry,
    /// Berries that need a species choice; deferred to the selection stage
    SpeciesBerry,
}

impl ExecutionPhase {
    pub fn of(operation: &Operation, rules: &dyn ItemRules) -> Self {
        match &operation.kind {
            OperationKind::Rename { .. } => Self::Rename,
            OperationKind::Pastry { .. } => Self::Pastry,
            OperationKind::Berry { berry_type } => {
                if rules.berry_requires_species_selection(berry_type) {
                    Self::SpeciesBerry
                } else {
                    Self::Berry
                }
            }
        }
    }
}

/// Output of the immediate phases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhaseRun {
    /// Results of rename, pastry and plain berry operations, in run order
    pub results: Vec<OperationResult>,
    /// Species berries, in build order
    pub deferred: Vec<Operation>,
}

pub struct PhasedExecutor {
    mutations: Arc<dyn MonsterMutationPort>,
    rules: Arc<dyn ItemRules>,
}

impl PhasedExecutor {
    pub fn new(mutations: Arc<dyn MonsterMutationPort>, rules: Arc<dyn ItemRules>) -> Self {
        Self { mutations, rules }
    }

    /// Run phases 1 to 3 and set species berries aside.
    ///
    /// Operations are stably sorted by phase, so build order is kept within
    /// a phase.
    pub async fn run_phases(
        &self,
        trainer_id: TrainerId,
        operations: Vec<Operation>,
        tracker: &mut SnapshotTracker,
    ) -> PhaseRun {
        let mut ordered: Vec<(ExecutionPhase, Operation)> = operations
            .into_iter()
            .map(|op| (ExecutionPhase::of(&op, self.rules.as_ref()), op))
            .collect();
        ordered.sort_by_key(|(phase, _)| *phase);

        let mut run = PhaseRun::default();
        for (phase, operation) in ordered {
            let result = match phase {
                ExecutionPhase::SpeciesBerry => {
                    run.deferred.push(operation);
                    continue;
                }
                ExecutionPhase::Rename => self.rename(operation, tracker).await,
                ExecutionPhase::Pastry => self.pastry(trainer_id, operation, tracker).await,
                ExecutionPhase::Berry => self.berry(trainer_id, operation, None, tracker).await,
            };
            run.results.push(result);
        }

        tracing::debug!(
            trainer_id = %trainer_id,
            executed = run.results.len(),
            deferred = run.deferred.len(),
            "Immediate phases finished"
        );
        run
    }

    /// Run species berries with their chosen species, in the given order.
    pub async fn run_species_berries(
        &self,
        trainer_id: TrainerId,
        selections: Vec<(Operation, String)>,
        tracker: &mut SnapshotTracker,
    ) -> Vec<OperationResult> {
        let mut results = Vec::with_capacity(selections.len());
        for (operation, species) in selections {
            results.push(self.berry(trainer_id, operation, Some(&species), tracker).await);
        }
        results
    }

    async fn rename(&self, operation: Operation, tracker: &mut SnapshotTracker) -> OperationResult {
        let OperationKind::Rename { new_name } = &operation.kind else {
            return OperationResult::error(operation, "Operation is not a rename");
        };
        let new_name = new_name.clone();
        let Some(before) = tracker.get(operation.monster_id).cloned() else {
            return untracked(operation);
        };
        let old_name = before.name.clone();

        match self.mutations.rename(operation.monster_id, new_name.clone()).await {
            Ok(MutationOutcome {
                success: true,
                monster,
                ..
            }) => {
                if let Some(patch) = &monster {
                    tracker.apply(operation.monster_id, patch);
                }
                let after = tracker
                    .rename(operation.monster_id, &new_name)
                    .cloned()
                    .unwrap_or_else(|| before.clone());
                log_success(&operation);
                let message = format!("Renamed {old_name} to {new_name}");
                let change = AppliedChange {
                    category: ChangeCategory::Name,
                    display_name: old_name.clone(),
                    before,
                    after,
                    before_value: Some(old_name),
                    after_value: Some(new_name),
                    new_monster: None,
                    needs_selection: false,
                };
                OperationResult::success(operation, message, change)
            }
            Ok(outcome) => {
                log_rejected(&operation, outcome.message.as_deref());
                OperationResult::error(operation, format!("Failed to rename {old_name}"))
            }
            Err(e) => {
                log_call_failed(&operation, &e);
                OperationResult::error(operation, format!("Error renaming {old_name}: {e}"))
            }
        }
    }

    async fn pastry(
        &self,
        trainer_id: TrainerId,
        operation: Operation,
        tracker: &mut SnapshotTracker,
    ) -> OperationResult {
        let OperationKind::Pastry { pastry_type, value } = &operation.kind else {
            return OperationResult::error(operation, "Operation is not a pastry");
        };
        let (pastry_type, value) = (pastry_type.clone(), value.clone());
        let Some(before) = tracker.get(operation.monster_id).cloned() else {
            return untracked(operation);
        };
        let name = before.name.clone();

        let request = PastryRequest {
            monster_id: operation.monster_id,
            pastry_type: pastry_type.clone(),
            trainer_id,
            value: value.clone(),
        };

        match self.mutations.use_pastry(request).await {
            Ok(MutationOutcome {
                success: true,
                monster,
                ..
            }) => {
                let after = merge(tracker, &before, monster.as_ref());
                log_success(&operation);
                let message = format!("Used {pastry_type} on {name} (value: {value})");
                let change = AppliedChange {
                    category: ChangeCategory::Pastry,
                    display_name: name,
                    before,
                    after,
                    before_value: None,
                    after_value: Some(value),
                    new_monster: None,
                    needs_selection: false,
                };
                OperationResult::success(operation, message, change)
            }
            Ok(outcome) => {
                log_rejected(&operation, outcome.message.as_deref());
                let reason = outcome.message.as_deref().unwrap_or("Unknown error");
                OperationResult::error(
                    operation,
                    format!("Failed to use {pastry_type} on {name}: {reason}"),
                )
            }
            Err(e) => {
                log_call_failed(&operation, &e);
                OperationResult::error(operation, format!("Error using {pastry_type}: {e}"))
            }
        }
    }

    async fn berry(
        &self,
        trainer_id: TrainerId,
        operation: Operation,
        species: Option<&str>,
        tracker: &mut SnapshotTracker,
    ) -> OperationResult {
        let OperationKind::Berry { berry_type } = &operation.kind else {
            return OperationResult::error(operation, "Operation is not a berry");
        };
        let berry_type = berry_type.clone();
        let Some(before) = tracker.get(operation.monster_id).cloned() else {
            return untracked(operation);
        };
        let name = before.name.clone();

        let request = BerryRequest {
            monster_id: operation.monster_id,
            berry_type: berry_type.clone(),
            trainer_id,
            species: species.map(str::to_string),
        };

        match self.mutations.use_berry(request).await {
            Ok(BerryOutcome {
                success: true,
                monster,
                new_monster,
                needs_selection,
                ..
            }) => {
                let after = merge(tracker, &before, monster.as_ref());
                log_success(&operation);

                let new_monster = new_monster.filter(|_| berry_type == DIVEST_BERRY);
                let message = match (&new_monster, species) {
                    (Some(spawned), _) => format!(
                        "Used {berry_type} on {name} - created new monster \"{}\"",
                        spawned.name
                    ),
                    (None, Some(species)) => {
                        format!("Used {berry_type} on {name} (selected: {species})")
                    }
                    (None, None) => format!("Used {berry_type} on {name}"),
                };
                let before_value = species.and_then(|_| {
                    self.rules
                        .species_slot_affected(&berry_type)
                        .and_then(|slot| before.species_slot(slot.index()))
                        .map(str::to_string)
                });

                let change = AppliedChange {
                    category: ChangeCategory::Berry,
                    display_name: name,
                    before,
                    after,
                    before_value,
                    after_value: species.map(str::to_string),
                    new_monster,
                    needs_selection,
                };
                OperationResult::success(operation, message, change)
            }
            Ok(outcome) => {
                log_rejected(&operation, outcome.message.as_deref());
                let reason = outcome.message.as_deref().unwrap_or("Unknown error");
                OperationResult::error(
                    operation,
                    format!("Failed to use {berry_type} on {name}: {reason}"),
                )
            }
            Err(e) => {
                log_call_failed(&operation, &e);
                OperationResult::error(operation, format!("Error using {berry_type}: {e}"))
            }
        }
    }
}

fn merge(
    tracker: &mut SnapshotTracker,
    before: &Monster,
    patch: Option<&MonsterPatch>,
) -> Monster {
    match patch {
        Some(patch) => tracker
            .apply(before.id, patch)
            .cloned()
            .unwrap_or_else(|| before.merged(patch)),
        None => before.clone(),
    }
}

fn untracked(operation: Operation) -> OperationResult {
    tracing::warn!(
        operation_id = %operation.id,
        monster_id = %operation.monster_id,
        "Operation targets a monster outside the batch"
    );
    let message = format!("{} is not part of this batch", operation.monster_name);
    OperationResult::error(operation, message)
}

fn log_success(operation: &Operation) {
    tracing::info!(
        operation_id = %operation.id,
        monster_id = %operation.monster_id,
        "Operation applied"
    );
}

fn log_rejected(operation: &Operation, reason: Option<&str>) {
    tracing::warn!(
        operation_id = %operation.id,
        monster_id = %operation.monster_id,
        reason = reason.unwrap_or("none given"),
        "Operation rejected by mutation service"
    );
}

fn log_call_failed(operation: &Operation, error: &ServiceError) {
    tracing::warn!(
        operation_id = %operation.id,
        monster_id = %operation.monster_id,
        error = %error,
        "Mutation call failed"
    );
}
