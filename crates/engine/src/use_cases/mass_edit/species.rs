//! Species resolution stage.
//!
//! Berries that need a species choice are held back by the executor. This
//! stage rolls candidates for each of them, fetches images for the whole
//! candidate pool in one lookup, and records the user's picks.

use std::collections::HashSet;
use std::sync::Arc;

use trainerhub_domain::{Operation, OperationId, OperationResult};

use crate::infrastructure::ports::{ServiceError, SpeciesImagePort, SpeciesRollerPort};

use super::error::SelectionError;
use super::types::{PendingSpeciesSelection, SpeciesSelectionRequest};

/// Result of rolling candidates for the deferred berries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollOutcome {
    /// Candidates are ready for the user to choose from
    Ready(SpeciesSelectionRequest),
    /// Rolling failed; one error result per deferred berry
    Failed(Vec<OperationResult>),
}

pub struct SpeciesResolver {
    roller: Arc<dyn SpeciesRollerPort>,
    images: Arc<dyn SpeciesImagePort>,
    roll_count: usize,
}

impl SpeciesResolver {
    pub fn new(
        roller: Arc<dyn SpeciesRollerPort>,
        images: Arc<dyn SpeciesImagePort>,
        roll_count: usize,
    ) -> Self {
        Self {
            roller,
            images,
            roll_count,
        }
    }

    /// Roll candidates for each operation, one call at a time.
    ///
    /// A failed or empty roll fails every operation in the set. A failed
    /// image lookup only leaves the image map empty.
    pub async fn roll(&self, operations: Vec<Operation>) -> RollOutcome {
        let mut pending = Vec::with_capacity(operations.len());

        for operation in &operations {
            let rolled = self.roller.roll(self.roll_count).await.and_then(|candidates| {
                if candidates.is_empty() {
                    Err(ServiceError::invalid_response("no species rolled"))
                } else {
                    Ok(candidates)
                }
            });
            match rolled {
                Ok(candidates) => {
                    tracing::debug!(
                        operation_id = %operation.id,
                        candidates = candidates.len(),
                        "Rolled species candidates"
                    );
                    pending.push(PendingSpeciesSelection::new(operation.clone(), candidates));
                }
                Err(e) => {
                    tracing::error!(
                        operation_id = %operation.id,
                        error = %e,
                        "Species roll failed, failing all species berries"
                    );
                    let message = e.to_string();
                    let results = operations
                        .into_iter()
                        .map(|op| {
                            let berry = op.berry_type().unwrap_or_default().to_string();
                            OperationResult::error(
                                op,
                                format!("Error rolling species for {berry}: {message}"),
                            )
                        })
                        .collect();
                    return RollOutcome::Failed(results);
                }
            }
        }

        let pool = candidate_pool(&pending);
        let images = if pool.is_empty() {
            Default::default()
        } else {
            match self.images.lookup(pool).await {
                Ok(images) => images,
                Err(e) => {
                    tracing::warn!(error = %e, "Species image lookup failed, continuing without images");
                    Default::default()
                }
            }
        };

        RollOutcome::Ready(SpeciesSelectionRequest { pending, images })
    }
}

/// Every rolled species once, in first-seen order.
fn candidate_pool(pending: &[PendingSpeciesSelection]) -> Vec<String> {
    let mut seen = HashSet::new();
    pending
        .iter()
        .flat_map(|p| p.candidates.iter())
        .filter(|species| seen.insert(species.as_str()))
        .cloned()
        .collect()
}

impl SpeciesSelectionRequest {
    /// Record the user's pick for one operation. Picking again replaces it.
    pub fn select(
        &mut self,
        operation_id: &OperationId,
        species: &str,
    ) -> Result<(), SelectionError> {
        let pending = self
            .pending
            .iter_mut()
            .find(|p| p.operation_id() == operation_id)
            .ok_or_else(|| SelectionError::UnknownOperation(operation_id.clone()))?;

        if !pending.candidates.iter().any(|c| c == species) {
            return Err(SelectionError::SpeciesNotRolled {
                operation_id: operation_id.clone(),
                species: species.to_string(),
            });
        }

        pending.selected = Some(species.to_string());
        Ok(())
    }

    /// Operations still waiting for a pick, in pending order.
    pub fn missing(&self) -> Vec<OperationId> {
        self.pending
            .iter()
            .filter(|p| p.selected.is_none())
            .map(|p| p.operation_id().clone())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.pending.iter().all(|p| p.selected.is_some())
    }

    /// Operations paired with their picks. Fails if any pick is missing.
    pub fn choices(&self) -> Result<Vec<(Operation, String)>, SelectionError> {
        let missing = self.missing();
        if !missing.is_empty() {
            return Err(SelectionError::Incomplete { missing });
        }
        Ok(self
            .pending
            .iter()
            .filter_map(|p| {
                p.selected
                    .as_ref()
                    .map(|species| (p.operation.clone(), species.clone()))
            })
            .collect())
    }
}
