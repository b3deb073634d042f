//! Result aggregation and inventory reconciliation.

use serde::{Deserialize, Serialize};
use trainerhub_domain::{BatchSummary, InventoryLedger, Monster, OperationResult};

/// Ledger after charging one unit per successful berry or pastry.
///
/// Pure: the same inputs always give the same ledger, so callers charge a
/// run exactly once by always starting from the ledger captured at batch
/// start.
pub fn reconcile(ledger: &InventoryLedger, results: &[OperationResult]) -> InventoryLedger {
    let mut next = ledger.clone();
    for result in results {
        let Some(change) = result.applied() else {
            continue;
        };
        let (Some(category), Some(item)) =
            (change.category.item_category(), result.operation.item_type())
        else {
            continue;
        };
        next.decrement(category, item);
    }
    next
}

/// Everything a finished run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Phase 1 to 4 results, in run order
    pub results: Vec<OperationResult>,
    pub summary: BatchSummary,
    /// Reconciled inventory
    pub inventory: InventoryLedger,
    /// Latest snapshot of every monster in the batch
    pub monsters: Vec<Monster>,
    /// Monsters spawned during the run (Divest Berry)
    pub new_monsters: Vec<Monster>,
}

impl BatchReport {
    pub fn new(
        results: Vec<OperationResult>,
        ledger_at_start: &InventoryLedger,
        monsters: Vec<Monster>,
    ) -> Self {
        let summary = BatchSummary::from_results(&results);
        let inventory = reconcile(ledger_at_start, &results);
        let new_monsters = results
            .iter()
            .filter_map(|r| r.applied().and_then(|c| c.new_monster.clone()))
            .collect();
        Self {
            results,
            summary,
            inventory,
            monsters,
            new_monsters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trainerhub_domain::{
        AppliedChange, ChangeCategory, ItemCategory, MonsterId, Operation,
    };

    fn monster() -> Monster {
        Monster::new(MonsterId::new(1), "Alpha", "Pikachu")
    }

    fn applied(category: ChangeCategory) -> AppliedChange {
        AppliedChange {
            category,
            display_name: "Alpha".to_string(),
            before: monster(),
            after: monster(),
            before_value: None,
            after_value: None,
            new_monster: None,
            needs_selection: false,
        }
    }

    fn berry_success(berry: &str) -> OperationResult {
        OperationResult::success(
            Operation::berry(MonsterId::new(1), "Alpha", 0, berry),
            "ok",
            applied(ChangeCategory::Berry),
        )
    }

    #[test]
    fn two_successful_oran_berries_empty_the_stack() {
        let ledger = InventoryLedger::new().with_berry("Oran Berry", 2);
        let results = vec![berry_success("Oran Berry"), berry_success("Oran Berry")];

        let next = reconcile(&ledger, &results);

        assert_eq!(next.count(ItemCategory::Berry, "Oran Berry"), 0);
    }

    #[test]
    fn failures_and_renames_are_not_charged() {
        let ledger = InventoryLedger::new()
            .with_berry("Oran Berry", 2)
            .with_pastry("Miraca Pastry", 1);
        let results = vec![
            OperationResult::error(
                Operation::berry(MonsterId::new(1), "Alpha", 0, "Oran Berry"),
                "Failed",
            ),
            OperationResult::success(
                Operation::rename(MonsterId::new(1), "Alpha", "Sparky"),
                "Renamed Alpha to Sparky",
                applied(ChangeCategory::Name),
            ),
            OperationResult::success(
                Operation::pastry(MonsterId::new(1), "Alpha", 0, "Miraca Pastry", "Fire"),
                "ok",
                applied(ChangeCategory::Pastry),
            ),
        ];

        let next = reconcile(&ledger, &results);

        assert_eq!(next.count(ItemCategory::Berry, "Oran Berry"), 2);
        assert_eq!(next.count(ItemCategory::Pastry, "Miraca Pastry"), 0);
    }

    #[test]
    fn reconciliation_never_goes_negative() {
        let ledger = InventoryLedger::new().with_berry("Oran Berry", 1);
        let results = vec![berry_success("Oran Berry"), berry_success("Oran Berry")];

        let next = reconcile(&ledger, &results);

        assert_eq!(next.count(ItemCategory::Berry, "Oran Berry"), 0);
    }

    #[test]
    fn reconciliation_is_idempotent_on_the_same_inputs() {
        let ledger = InventoryLedger::new().with_berry("Oran Berry", 5);
        let results = vec![berry_success("Oran Berry")];

        let once = reconcile(&ledger, &results);
        let twice = reconcile(&ledger, &results);

        assert_eq!(once, twice);
        assert_eq!(once.count(ItemCategory::Berry, "Oran Berry"), 4);
    }

    #[test]
    fn report_tallies_and_collects_spawned_monsters() {
        let mut divest = applied(ChangeCategory::Berry);
        divest.new_monster = Some(Monster::new(MonsterId::new(99), "Agumon", "Agumon"));
        let results = vec![
            OperationResult::success(
                Operation::berry(MonsterId::new(1), "Alpha", 0, "Divest Berry"),
                "ok",
                divest,
            ),
            OperationResult::error(
                Operation::berry(MonsterId::new(1), "Alpha", 1, "Oran Berry"),
                "Failed",
            ),
        ];
        let ledger = InventoryLedger::new()
            .with_berry("Divest Berry", 1)
            .with_berry("Oran Berry", 1);

        let report = BatchReport::new(results, &ledger, vec![monster()]);

        assert_eq!(report.summary.success_count, 1);
        assert_eq!(report.summary.error_count, 1);
        assert_eq!(report.new_monsters.len(), 1);
        assert_eq!(report.inventory.count(ItemCategory::Berry, "Divest Berry"), 0);
        assert_eq!(report.inventory.count(ItemCategory::Berry, "Oran Berry"), 1);
    }
}
