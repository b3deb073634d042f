//! External service ports (inventory, monster mutations, species roller).

use std::collections::BTreeMap;

use async_trait::async_trait;
use trainerhub_domain::{InventoryLedger, Monster, MonsterId, MonsterPatch, TrainerId};

use super::error::ServiceError;

// =============================================================================
// Mutation Types
// =============================================================================

/// Consume one pastry on a monster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PastryRequest {
    pub monster_id: MonsterId,
    pub pastry_type: String,
    pub trainer_id: TrainerId,
    /// Free-form value the pastry sets (a type, species or attribute)
    pub value: String,
}

/// Consume one berry on a monster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BerryRequest {
    pub monster_id: MonsterId,
    pub berry_type: String,
    pub trainer_id: TrainerId,
    /// Chosen species for berries that need a selection
    pub species: Option<String>,
}

/// What the service reported for a rename or pastry call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationOutcome {
    pub success: bool,
    pub message: Option<String>,
    pub monster: Option<MonsterPatch>,
}

impl MutationOutcome {
    pub fn applied(monster: MonsterPatch) -> Self {
        Self {
            success: true,
            message: None,
            monster: Some(monster),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            monster: None,
        }
    }
}

/// What the service reported for a berry call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BerryOutcome {
    pub success: bool,
    pub message: Option<String>,
    pub monster: Option<MonsterPatch>,
    /// Spawned by a Divest Berry split
    pub new_monster: Option<Monster>,
    pub needs_selection: bool,
}

impl BerryOutcome {
    pub fn applied(monster: MonsterPatch) -> Self {
        Self {
            success: true,
            monster: Some(monster),
            ..Self::default()
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_new_monster(mut self, monster: Monster) -> Self {
        self.new_monster = Some(monster);
        self
    }
}

// =============================================================================
// Ports
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InventoryPort: Send + Sync {
    /// Current berry and pastry counts for a trainer.
    async fn get_inventory(&self, trainer_id: TrainerId) -> Result<InventoryLedger, ServiceError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MonsterMutationPort: Send + Sync {
    async fn rename(
        &self,
        monster_id: MonsterId,
        new_name: String,
    ) -> Result<MutationOutcome, ServiceError>;

    async fn use_pastry(&self, request: PastryRequest) -> Result<MutationOutcome, ServiceError>;

    async fn use_berry(&self, request: BerryRequest) -> Result<BerryOutcome, ServiceError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeciesRollerPort: Send + Sync {
    /// Roll `count` candidate species. Calls are independent; results may
    /// repeat across calls.
    async fn roll(&self, count: usize) -> Result<Vec<String>, ServiceError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeciesImagePort: Send + Sync {
    /// Image reference per species. Species without an image are omitted.
    async fn lookup(&self, species: Vec<String>) -> Result<BTreeMap<String, String>, ServiceError>;
}
