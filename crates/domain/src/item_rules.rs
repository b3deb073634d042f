//! Item applicability rules.
//!
//! The mutation service owns game balance; these rules only answer the
//! questions the mass editor needs before it calls the service: can this
//! item change this monster, and does this berry need a species choice.

use serde::{Deserialize, Serialize};

use crate::Monster;

/// A 1-based species slot on a monster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpeciesSlot {
    First,
    Second,
    Third,
}

impl SpeciesSlot {
    pub fn index(self) -> usize {
        match self {
            SpeciesSlot::First => 1,
            SpeciesSlot::Second => 2,
            SpeciesSlot::Third => 3,
        }
    }
}

/// What kind of free-form value a pastry asks the user for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PastryValueKind {
    Type,
    Species,
    Attribute,
}

/// Read-only item predicates consumed by the mass-edit pipeline.
pub trait ItemRules: Send + Sync {
    fn can_berry_affect(&self, berry: &str, monster: &Monster) -> bool;

    fn can_pastry_affect(&self, pastry: &str, monster: &Monster) -> bool;

    fn berry_requires_species_selection(&self, berry: &str) -> bool;

    fn species_slot_affected(&self, berry: &str) -> Option<SpeciesSlot>;

    /// Kind of value a pastry needs, or `None` for unknown pastries.
    fn pastry_value_kind(&self, pastry: &str) -> Option<PastryValueKind>;
}

/// Name of the berry that splits a monster and may spawn a new one.
pub const DIVEST_BERRY: &str = "Divest Berry";

// Berries with their own flows elsewhere on the site; never offered in bulk.
const EXCLUDED_BERRIES: &[&str] = &["Edenweiss", "Edenwiess", "Forget-Me-Not", "Forget-me-Not"];

/// Effect family shared by a berry and its pastry counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Effect {
    RemoveSpecies(usize),
    RemoveType(usize),
    RandomizeType(usize),
    AddType(usize),
    RandomizeSpecies(SpeciesSlot),
    AddSpecies(SpeciesSlot),
    RandomizeAttribute,
    Split,
}

fn effect_for(stem: &str) -> Option<Effect> {
    let effect = match stem {
        "Bugger" => Effect::RemoveSpecies(1),
        "Mala" => Effect::RemoveSpecies(2),
        "Merco" => Effect::RemoveSpecies(3),
        "Siron" => Effect::RemoveType(1),
        "Lilan" => Effect::RemoveType(2),
        "Kham" => Effect::RemoveType(3),
        "Maizi" => Effect::RemoveType(4),
        "Fani" => Effect::RemoveType(5),
        "Miraca" => Effect::RandomizeType(1),
        "Cocon" => Effect::RandomizeType(2),
        "Durian" => Effect::RandomizeType(3),
        "Monel" => Effect::RandomizeType(4),
        "Perep" => Effect::RandomizeType(5),
        "Addish" => Effect::AddType(2),
        "Sky Carrot" => Effect::AddType(3),
        "Kembre" => Effect::AddType(4),
        "Espara" => Effect::AddType(5),
        "Patama" => Effect::RandomizeSpecies(SpeciesSlot::First),
        "Bluk" => Effect::RandomizeSpecies(SpeciesSlot::Second),
        "Nuevo" => Effect::RandomizeSpecies(SpeciesSlot::Third),
        "Azzuk" => Effect::AddSpecies(SpeciesSlot::Second),
        "Mangus" => Effect::AddSpecies(SpeciesSlot::Third),
        "Datei" => Effect::RandomizeAttribute,
        "Divest" => Effect::Split,
        _ => return None,
    };
    Some(effect)
}

impl Effect {
    fn applies_to(self, monster: &Monster) -> bool {
        match self {
            // Removing species N shifts later slots down, so the monster
            // needs a species after the removed one to keep at least one.
            Effect::RemoveSpecies(1) | Effect::RemoveSpecies(2) => monster.species_slot(2).is_some(),
            Effect::RemoveSpecies(slot) => monster.species_slot(slot).is_some(),
            // Removing the primary type promotes type2; needs any secondary.
            Effect::RemoveType(1) => (2..=5).any(|slot| monster.type_slot(slot).is_some()),
            Effect::RemoveType(slot) | Effect::RandomizeType(slot) if slot > 1 => {
                monster.type_slot(slot).is_some()
            }
            Effect::RandomizeType(_) => true,
            Effect::RemoveType(_) => false,
            Effect::AddType(slot) => monster.type_slot(slot).is_none(),
            Effect::RandomizeSpecies(SpeciesSlot::First) => true,
            Effect::RandomizeSpecies(slot) => monster.species_slot(slot.index()).is_some(),
            Effect::AddSpecies(slot) => monster.species_slot(slot.index()).is_none(),
            Effect::RandomizeAttribute => true,
            Effect::Split => monster.species_slot(2).is_some(),
        }
    }
}

/// The item table used by the community site.
///
/// Unknown items are reported as usable; the mutation service is the final
/// authority and will reject them if they do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardItemRules;

impl StandardItemRules {
    pub fn new() -> Self {
        Self
    }
}

fn stem<'a>(item: &'a str, suffix: &str) -> &'a str {
    let item = item.trim();
    item.strip_suffix(suffix).unwrap_or(item)
}

impl ItemRules for StandardItemRules {
    fn can_berry_affect(&self, berry: &str, monster: &Monster) -> bool {
        let name = berry.trim();
        if EXCLUDED_BERRIES
            .iter()
            .any(|excluded| name.eq_ignore_ascii_case(excluded))
        {
            return false;
        }
        effect_for(stem(name, " Berry")).map_or(true, |effect| effect.applies_to(monster))
    }

    fn can_pastry_affect(&self, pastry: &str, monster: &Monster) -> bool {
        match effect_for(stem(pastry, " Pastry")) {
            // Pastries set a chosen value, so "randomize" slots behave as "set".
            Some(Effect::Split) | Some(Effect::RemoveSpecies(_)) | Some(Effect::RemoveType(_)) => {
                false
            }
            Some(effect) => effect.applies_to(monster),
            None => true,
        }
    }

    fn berry_requires_species_selection(&self, berry: &str) -> bool {
        self.species_slot_affected(berry).is_some()
    }

    fn species_slot_affected(&self, berry: &str) -> Option<SpeciesSlot> {
        match effect_for(stem(berry, " Berry"))? {
            Effect::RandomizeSpecies(slot) | Effect::AddSpecies(slot) => Some(slot),
            _ => None,
        }
    }

    fn pastry_value_kind(&self, pastry: &str) -> Option<PastryValueKind> {
        match effect_for(stem(pastry, " Pastry"))? {
            Effect::RandomizeType(_) | Effect::AddType(_) => Some(PastryValueKind::Type),
            Effect::RandomizeSpecies(_) | Effect::AddSpecies(_) => Some(PastryValueKind::Species),
            Effect::RandomizeAttribute => Some(PastryValueKind::Attribute),
            _ => None,
        }
    }
}
