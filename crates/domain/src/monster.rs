//! Monster snapshots and the partial updates the mutation service returns.

use serde::{Deserialize, Deserializer, Serialize};

use crate::MonsterId;

pub const MAX_SPECIES_SLOTS: usize = 3;
pub const MAX_TYPE_SLOTS: usize = 5;

/// A trainer's monster as last seen by the engine.
///
/// Field names follow the community site's wire format (`species1`,
/// `type3`, `img_link`). Fields the engine does not care about are ignored
/// on deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Monster {
    pub id: MonsterId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub species1: String,
    #[serde(default)]
    pub species2: Option<String>,
    #[serde(default)]
    pub species3: Option<String>,
    #[serde(default)]
    pub type1: Option<String>,
    #[serde(default)]
    pub type2: Option<String>,
    #[serde(default)]
    pub type3: Option<String>,
    #[serde(default)]
    pub type4: Option<String>,
    #[serde(default)]
    pub type5: Option<String>,
    #[serde(default)]
    pub attribute: Option<String>,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default)]
    pub img_link: Option<String>,
}

fn default_level() -> u32 {
    1
}

impl Monster {
    pub fn new(id: MonsterId, name: impl Into<String>, species1: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            species1: species1.into(),
            species2: None,
            species3: None,
            type1: None,
            type2: None,
            type3: None,
            type4: None,
            type5: None,
            attribute: None,
            level: default_level(),
            img_link: None,
        }
    }

    pub fn with_species(mut self, species2: Option<&str>, species3: Option<&str>) -> Self {
        self.species2 = species2.map(str::to_string);
        self.species3 = species3.map(str::to_string);
        self
    }

    pub fn with_types(mut self, types: &[&str]) -> Self {
        let mut slots = types.iter().map(|t| Some((*t).to_string()));
        self.type1 = slots.next().flatten();
        self.type2 = slots.next().flatten();
        self.type3 = slots.next().flatten();
        self.type4 = slots.next().flatten();
        self.type5 = slots.next().flatten();
        self
    }

    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    /// Species slot by 1-based position. Blank values count as empty.
    pub fn species_slot(&self, slot: usize) -> Option<&str> {
        let value = match slot {
            1 => Some(self.species1.as_str()),
            2 => self.species2.as_deref(),
            3 => self.species3.as_deref(),
            _ => None,
        };
        value.filter(|s| !s.trim().is_empty())
    }

    /// Type slot by 1-based position. Blank values count as empty.
    pub fn type_slot(&self, slot: usize) -> Option<&str> {
        let value = match slot {
            1 => self.type1.as_deref(),
            2 => self.type2.as_deref(),
            3 => self.type3.as_deref(),
            4 => self.type4.as_deref(),
            5 => self.type5.as_deref(),
            _ => None,
        };
        value.filter(|s| !s.trim().is_empty())
    }

    pub fn species(&self) -> Vec<&str> {
        (1..=MAX_SPECIES_SLOTS)
            .filter_map(|slot| self.species_slot(slot))
            .collect()
    }

    pub fn types(&self) -> Vec<&str> {
        (1..=MAX_TYPE_SLOTS)
            .filter_map(|slot| self.type_slot(slot))
            .collect()
    }

    /// Merge a partial update onto this snapshot.
    ///
    /// Absent patch fields leave the snapshot untouched; explicit nulls clear
    /// optional fields.
    pub fn apply(&mut self, patch: &MonsterPatch) {
        if let Some(name) = &patch.name {
            self.name.clone_from(name);
        }
        if let Some(species1) = &patch.species1 {
            self.species1.clone_from(species1);
        }
        if let Some(level) = patch.level {
            self.level = level;
        }
        merge_optional(&mut self.species2, &patch.species2);
        merge_optional(&mut self.species3, &patch.species3);
        merge_optional(&mut self.type1, &patch.type1);
        merge_optional(&mut self.type2, &patch.type2);
        merge_optional(&mut self.type3, &patch.type3);
        merge_optional(&mut self.type4, &patch.type4);
        merge_optional(&mut self.type5, &patch.type5);
        merge_optional(&mut self.attribute, &patch.attribute);
        merge_optional(&mut self.img_link, &patch.img_link);
    }

    /// Copy of this snapshot with `patch` merged on top.
    pub fn merged(&self, patch: &MonsterPatch) -> Self {
        let mut next = self.clone();
        next.apply(patch);
        next
    }
}

fn merge_optional(slot: &mut Option<String>, update: &Option<Option<String>>) {
    if let Some(value) = update {
        slot.clone_from(value);
    }
}

/// Fields returned by the mutation service after a change.
///
/// Optional monster fields are tri-state: `None` means the service did not
/// send the field, `Some(None)` means it sent an explicit `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonsterPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub species1: Option<String>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub species2: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub species3: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub type1: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub type2: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub type3: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub type4: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub type5: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub attribute: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub img_link: Option<Option<String>>,
}

// A field that is present in the payload is always `Some`, even when null.
fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

impl MonsterPatch {
    pub fn renamed(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Monster {
        Monster::new(MonsterId::new(1), "Sparky", "Pikachu")
            .with_species(Some("Agumon"), Some("Eevee"))
            .with_types(&["Electric", "Fire"])
            .with_attribute("Vaccine")
    }

    #[test]
    fn absent_fields_survive_merge() {
        let mut monster = sample();
        let patch: MonsterPatch = serde_json::from_str(r#"{"type2":"Water"}"#).unwrap();

        monster.apply(&patch);

        assert_eq!(monster.type2.as_deref(), Some("Water"));
        assert_eq!(monster.species3.as_deref(), Some("Eevee"));
        assert_eq!(monster.attribute.as_deref(), Some("Vaccine"));
        assert_eq!(monster.name, "Sparky");
    }

    #[test]
    fn explicit_null_clears_optional_field() {
        let mut monster = sample();
        let patch: MonsterPatch = serde_json::from_str(r#"{"species3":null}"#).unwrap();
        assert_eq!(patch.species3, Some(None));

        monster.apply(&patch);

        assert_eq!(monster.species3, None);
        assert_eq!(monster.species(), vec!["Pikachu", "Agumon"]);
    }

    #[test]
    fn full_service_row_deserializes_ignoring_unknown_fields() {
        let json = r#"{
            "id": 9, "trainer_id": 3, "name": "Bolt", "species1": "Raichu",
            "species2": null, "type1": "Electric", "level": 12, "created_at": "x"
        }"#;
        let monster: Monster = serde_json::from_str(json).unwrap();
        assert_eq!(monster.id, MonsterId::new(9));
        assert_eq!(monster.level, 12);
        assert_eq!(monster.types(), vec!["Electric"]);
    }

    #[test]
    fn blank_slots_are_treated_as_empty() {
        let mut monster = sample();
        monster.type2 = Some("  ".to_string());
        assert_eq!(monster.type_slot(2), None);
        assert_eq!(monster.types(), vec!["Electric"]);
    }

    #[test]
    fn merged_leaves_original_untouched() {
        let original = sample();
        let next = original.merged(&MonsterPatch::renamed("Zap"));
        assert_eq!(original.name, "Sparky");
        assert_eq!(next.name, "Zap");
    }
}
