//! Application state and composition.

use std::sync::Arc;

use trainerhub_domain::{ItemRules, StandardItemRules};

use crate::infrastructure::{
    clock::SystemClock,
    config::EngineConfig,
    ports::{ClockPort, InventoryPort, MonsterMutationPort, SpeciesImagePort, SpeciesRollerPort},
    trainerhub_api::HttpTrainerHubClient,
};
use crate::stores::MassEditStore;
use crate::use_cases::mass_edit::{MassEdit, MassEditUseCases, PhasedExecutor, SpeciesResolver};

/// Main application state.
///
/// Passed to HTTP handlers via Axum state.
pub struct App {
    pub use_cases: UseCases,
    pub stores: Stores,
    pub rules: Arc<dyn ItemRules>,
    pub config: EngineConfig,
}

/// Container for all use cases.
pub struct UseCases {
    pub mass_edit: MassEditUseCases,
}

/// Container for in-memory state.
pub struct Stores {
    pub mass_edit: Arc<MassEditStore>,
}

/// External collaborators the engine talks to.
pub struct Ports {
    pub inventory: Arc<dyn InventoryPort>,
    pub mutations: Arc<dyn MonsterMutationPort>,
    pub roller: Arc<dyn SpeciesRollerPort>,
    pub images: Arc<dyn SpeciesImagePort>,
    pub clock: Arc<dyn ClockPort>,
}

impl Ports {
    /// Every service port backed by the community site's REST API.
    pub fn from_config(config: &EngineConfig) -> Self {
        let client = Arc::new(HttpTrainerHubClient::new(
            &config.api_base_url,
            config.api_token.clone(),
            config.request_timeout,
        ));
        Self {
            inventory: client.clone(),
            mutations: client.clone(),
            roller: client.clone(),
            images: client,
            clock: Arc::new(SystemClock::new()),
        }
    }
}

impl App {
    /// Create a new App with all dependencies wired up.
    pub fn new(config: EngineConfig, ports: Ports) -> Self {
        let rules: Arc<dyn ItemRules> = Arc::new(StandardItemRules::new());

        let executor = Arc::new(PhasedExecutor::new(ports.mutations, rules.clone()));
        let resolver = Arc::new(SpeciesResolver::new(
            ports.roller,
            ports.images,
            config.species_roll_count,
        ));
        let mass_edit = Arc::new(MassEdit::new(
            ports.inventory,
            executor,
            resolver,
            ports.clock,
        ));

        Self {
            use_cases: UseCases {
                mass_edit: MassEditUseCases::new(mass_edit),
            },
            stores: Stores {
                mass_edit: Arc::new(MassEditStore::new(config.selection_ttl)),
            },
            rules,
            config,
        }
    }
}
