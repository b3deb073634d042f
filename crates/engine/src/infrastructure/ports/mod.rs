//! Port traits for infrastructure boundaries.
//!
//! These are the only abstractions in the engine. Ports exist for:
//! - Inventory reads (community site REST API)
//! - Monster mutations (rename, pastry, berry)
//! - Species rolling and species image lookup
//! - Clock (for testing)

mod error;
mod external;
mod testing;

// =============================================================================
// External Service Ports
// =============================================================================
pub use external::{
    BerryOutcome, BerryRequest, InventoryPort, MonsterMutationPort, MutationOutcome,
    PastryRequest, SpeciesImagePort, SpeciesRollerPort,
};

#[cfg(test)]
pub use external::{
    MockInventoryPort, MockMonsterMutationPort, MockSpeciesImagePort, MockSpeciesRollerPort,
};

// =============================================================================
// Testing Ports
// =============================================================================
pub use testing::ClockPort;

#[cfg(test)]
pub use testing::MockClockPort;

// =============================================================================
// Error Types
// =============================================================================
pub use error::ServiceError;
