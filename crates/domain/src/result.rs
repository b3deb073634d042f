//! Per-operation outcomes and batch tallies.

use serde::{Deserialize, Serialize};

use crate::{ItemCategory, Monster, Operation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Success,
    Error,
}

/// Which aspect of the monster a successful operation changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeCategory {
    Name,
    Berry,
    Pastry,
}

impl ChangeCategory {
    /// Inventory category spent by changes of this kind.
    pub fn item_category(self) -> Option<ItemCategory> {
        match self {
            ChangeCategory::Name => None,
            ChangeCategory::Berry => Some(ItemCategory::Berry),
            ChangeCategory::Pastry => Some(ItemCategory::Pastry),
        }
    }
}

/// Before/after record of a change the mutation service accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedChange {
    pub category: ChangeCategory,
    /// Monster name at the time the operation ran
    pub display_name: String,
    pub before: Monster,
    pub after: Monster,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_value: Option<String>,
    /// Monster spawned by a Divest Berry split
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_monster: Option<Monster>,
    #[serde(default)]
    pub needs_selection: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OperationOutcome {
    Success(Box<AppliedChange>),
    Error,
}

/// Result of one operation in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    pub operation: Operation,
    pub message: String,
    #[serde(flatten)]
    pub outcome: OperationOutcome,
}

impl OperationResult {
    pub fn success(operation: Operation, message: impl Into<String>, change: AppliedChange) -> Self {
        Self {
            operation,
            message: message.into(),
            outcome: OperationOutcome::Success(Box::new(change)),
        }
    }

    pub fn error(operation: Operation, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
            outcome: OperationOutcome::Error,
        }
    }

    pub fn status(&self) -> ResultStatus {
        match self.outcome {
            OperationOutcome::Success(_) => ResultStatus::Success,
            OperationOutcome::Error => ResultStatus::Error,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status() == ResultStatus::Success
    }

    pub fn applied(&self) -> Option<&AppliedChange> {
        match &self.outcome {
            OperationOutcome::Success(change) => Some(change),
            OperationOutcome::Error => None,
        }
    }
}

/// Success and failure counts for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub success_count: usize,
    pub error_count: usize,
    pub total: usize,
}

impl BatchSummary {
    pub fn from_results(results: &[OperationResult]) -> Self {
        let success_count = results.iter().filter(|r| r.is_success()).count();
        Self {
            success_count,
            error_count: results.len() - success_count,
            total: results.len(),
        }
    }
}
