use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::assessment::{Assessment, AssessmentId, AssessmentStatus};
use crate::budget::BudgetRecord;
use crate::hierarchy::fiscal::{FiscalYear, YearFilter};
use crate::hierarchy::{HierarchyDirectory, ProvinceId, RegionId, UnitId};

/// Read-model row: the slice of an assessment the aggregation engine needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssessmentSnapshot {
    pub id: AssessmentId,
    pub unit: UnitId,
    pub fiscal_year: FiscalYear,
    pub status: AssessmentStatus,
    pub total_score: Option<f64>,
    /// Impact on the canonical 0–100 scale; legacy rows are normalized at
    /// snapshot time so mixed schema generations never meet in a sum.
    pub impact_normalized: Option<f64>,
    pub sequence: u64,
}

impl From<&Assessment> for AssessmentSnapshot {
    fn from(assessment: &Assessment) -> Self {
        Self {
            id: assessment.id.clone(),
            unit: assessment.unit.clone(),
            fiscal_year: assessment.fiscal_year,
            status: assessment.status,
            total_score: assessment.total_score,
            impact_normalized: assessment.impact.as_ref().map(|impact| impact.normalized()),
            sequence: assessment.sequence,
        }
    }
}

/// Running total plus the set of contributing units. A set, not a counter:
/// several records from the same unit must never double count it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Bucket {
    pub total: f64,
    pub contributing: BTreeSet<UnitId>,
}

impl Bucket {
    fn add(&mut self, unit: &UnitId, amount: f64) {
        self.total += amount;
        self.contributing.insert(unit.clone());
    }

    pub fn unit_count(&self) -> usize {
        self.contributing.len()
    }

    /// Average over contributing units only. Units with no qualifying data
    /// are excluded from numerator and denominator alike; "not assessed"
    /// is never zero.
    pub fn average(&self) -> Option<f64> {
        if self.contributing.is_empty() {
            None
        } else {
            Some(self.total / self.contributing.len() as f64)
        }
    }
}

/// Region/province/unit keyed folds, recomputed from scratch per refresh.
/// Snapshots are read-only; drill-down views index into them level by level.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RollupTable {
    pub regions: HashMap<RegionId, Bucket>,
    pub provinces: HashMap<ProvinceId, Bucket>,
    pub units: HashMap<UnitId, Bucket>,
    /// Rows skipped because their unit had no resolvable ancestry.
    pub skipped: usize,
}

impl RollupTable {
    fn fold(&mut self, directory: &HierarchyDirectory, unit: &UnitId, amount: f64) {
        let Some(chain) = directory.ancestry(unit) else {
            self.skipped += 1;
            return;
        };
        self.regions
            .entry(chain.region.id.clone())
            .or_default()
            .add(unit, amount);
        self.provinces
            .entry(chain.province.id.clone())
            .or_default()
            .add(unit, amount);
        self.units.entry(unit.clone()).or_default().add(unit, amount);
    }
}

/// Select the single most-recent qualifying assessment per unit: filter by
/// fiscal year and (where required) approved status, then keep the highest
/// creation sequence. A unit contributes at most one data point to any
/// aggregate, never one per historical cycle.
pub fn latest_qualifying(
    snapshots: &[AssessmentSnapshot],
    filter: YearFilter,
    approved_only: bool,
) -> HashMap<UnitId, AssessmentSnapshot> {
    let mut latest: HashMap<UnitId, AssessmentSnapshot> = HashMap::new();
    for snapshot in snapshots {
        if !filter.matches(snapshot.fiscal_year) {
            continue;
        }
        if approved_only && !snapshot.status.counts_as_approved() {
            continue;
        }
        match latest.get(&snapshot.unit) {
            Some(existing) if existing.sequence >= snapshot.sequence => {}
            _ => {
                latest.insert(snapshot.unit.clone(), snapshot.clone());
            }
        }
    }
    latest
}

/// Fold approved assessment totals into the hierarchy.
pub fn rollup_scores(
    directory: &HierarchyDirectory,
    snapshots: &[AssessmentSnapshot],
    filter: YearFilter,
) -> RollupTable {
    let mut table = RollupTable::default();
    for snapshot in latest_qualifying(snapshots, filter, true).values() {
        let Some(total) = snapshot.total_score else {
            continue;
        };
        table.fold(directory, &snapshot.unit, total);
    }
    table
}

/// Fold normalized impact scores into the hierarchy. Units whose latest
/// approved cycle carries no impact record are excluded entirely.
pub fn rollup_impact(
    directory: &HierarchyDirectory,
    snapshots: &[AssessmentSnapshot],
    filter: YearFilter,
) -> RollupTable {
    let mut table = RollupTable::default();
    for snapshot in latest_qualifying(snapshots, filter, true).values() {
        let Some(impact) = snapshot.impact_normalized else {
            continue;
        };
        table.fold(directory, &snapshot.unit, impact);
    }
    table
}

/// Fold budget figures into the hierarchy. Every category row adds to the
/// totals while the unit sets deduplicate coverage counts.
pub fn rollup_budgets(
    directory: &HierarchyDirectory,
    records: &[BudgetRecord],
    filter: YearFilter,
) -> RollupTable {
    let mut table = RollupTable::default();
    for record in records {
        if !filter.matches(record.fiscal_year) {
            continue;
        }
        table.fold(directory, &record.unit, record.amount);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::SecurityCategory;
    use crate::hierarchy::{HealthRegion, OrganizationalUnit, Province, UnitKind};

    fn directory() -> HierarchyDirectory {
        let provinces = ["p1", "p2", "p3"];
        let mut units = Vec::new();
        for (index, province) in provinces.iter().enumerate() {
            for slot in 0..2 {
                units.push(OrganizationalUnit {
                    id: UnitId(format!("h{}{}", index + 1, slot + 1)),
                    name: format!("Hospital {}-{}", index + 1, slot + 1),
                    kind: UnitKind::Hospital,
                    province: ProvinceId((*province).into()),
                });
            }
        }
        HierarchyDirectory::build(
            vec![HealthRegion {
                id: RegionId("r1".into()),
                name: "Region One".into(),
            }],
            provinces
                .iter()
                .map(|id| Province {
                    id: ProvinceId((*id).into()),
                    name: format!("Province {id}"),
                    region: RegionId("r1".into()),
                })
                .collect(),
            units,
        )
        .expect("directory builds")
    }

    fn snapshot(
        unit: &str,
        sequence: u64,
        status: AssessmentStatus,
        total_score: Option<f64>,
        impact: Option<f64>,
    ) -> AssessmentSnapshot {
        AssessmentSnapshot {
            id: AssessmentId(format!("asm-{sequence:06}")),
            unit: UnitId(unit.into()),
            fiscal_year: FiscalYear(2026),
            status,
            total_score,
            impact_normalized: impact,
            sequence,
        }
    }

    fn budget(unit: &str, amount: f64) -> BudgetRecord {
        BudgetRecord {
            unit: UnitId(unit.into()),
            fiscal_year: FiscalYear(2026),
            category: SecurityCategory::AccessControl,
            amount,
        }
    }

    #[test]
    fn budgets_roll_up_across_three_provinces() {
        let directory = directory();
        let records = vec![
            budget("h11", 10.0),
            budget("h12", 20.0),
            budget("h21", 30.0),
            budget("h22", 40.0),
            budget("h31", 50.0),
            budget("h32", 60.0),
        ];
        let table = rollup_budgets(&directory, &records, YearFilter::All);

        assert_eq!(table.regions[&RegionId("r1".into())].total, 210.0);
        assert_eq!(table.provinces[&ProvinceId("p1".into())].total, 30.0);
        assert_eq!(table.provinces[&ProvinceId("p2".into())].total, 70.0);
        assert_eq!(table.provinces[&ProvinceId("p3".into())].total, 110.0);
        assert_eq!(table.regions[&RegionId("r1".into())].unit_count(), 6);
    }

    #[test]
    fn multiple_category_rows_count_the_unit_once() {
        let directory = directory();
        let records = vec![
            BudgetRecord {
                category: SecurityCategory::NetworkSecurity,
                ..budget("h11", 5.0)
            },
            budget("h11", 10.0),
        ];
        let table = rollup_budgets(&directory, &records, YearFilter::All);

        let bucket = &table.units[&UnitId("h11".into())];
        assert_eq!(bucket.total, 15.0);
        assert_eq!(bucket.unit_count(), 1);
        assert_eq!(table.regions[&RegionId("r1".into())].unit_count(), 1);
    }

    #[test]
    fn only_approved_cycles_feed_score_aggregates() {
        let directory = directory();
        let snapshots = vec![
            snapshot("h11", 1, AssessmentStatus::ApprovedProvincial, Some(80.0), None),
            snapshot("h12", 2, AssessmentStatus::Submitted, Some(90.0), None),
            snapshot("h21", 3, AssessmentStatus::Draft, Some(70.0), None),
            snapshot("h22", 4, AssessmentStatus::Returned, Some(60.0), None),
        ];
        let table = rollup_scores(&directory, &snapshots, YearFilter::All);

        assert_eq!(table.regions[&RegionId("r1".into())].total, 80.0);
        assert_eq!(table.regions[&RegionId("r1".into())].unit_count(), 1);
        assert!(!table.units.contains_key(&UnitId("h12".into())));
    }

    #[test]
    fn latest_cycle_wins_per_unit() {
        let directory = directory();
        let snapshots = vec![
            snapshot("h11", 1, AssessmentStatus::ApprovedRegional, Some(40.0), None),
            snapshot("h11", 7, AssessmentStatus::ApprovedProvincial, Some(90.0), None),
            snapshot("h11", 3, AssessmentStatus::ApprovedRegional, Some(55.0), None),
        ];
        let table = rollup_scores(&directory, &snapshots, YearFilter::All);

        let bucket = &table.units[&UnitId("h11".into())];
        assert_eq!(bucket.total, 90.0);
        assert_eq!(bucket.unit_count(), 1);
    }

    #[test]
    fn units_without_qualifying_cycles_stay_out_of_averages() {
        let directory = directory();
        let snapshots = vec![
            snapshot("h11", 1, AssessmentStatus::ApprovedProvincial, Some(100.0), Some(100.0)),
            snapshot("h12", 2, AssessmentStatus::ApprovedProvincial, Some(50.0), Some(40.0)),
            // h21 has a draft only: excluded from numerator and denominator.
            snapshot("h21", 3, AssessmentStatus::Draft, Some(0.0), Some(0.0)),
        ];
        let table = rollup_impact(&directory, &snapshots, YearFilter::All);

        let region = &table.regions[&RegionId("r1".into())];
        assert_eq!(region.unit_count(), 2);
        assert_eq!(region.average(), Some(70.0));
    }

    #[test]
    fn year_filter_scopes_the_fold() {
        let directory = directory();
        let mut older = snapshot("h11", 1, AssessmentStatus::ApprovedRegional, Some(30.0), None);
        older.fiscal_year = FiscalYear(2025);
        let snapshots = vec![
            older,
            snapshot("h12", 2, AssessmentStatus::ApprovedRegional, Some(60.0), None),
        ];

        let table = rollup_scores(
            &directory,
            &snapshots,
            YearFilter::One(FiscalYear(2026)),
        );
        assert_eq!(table.regions[&RegionId("r1".into())].total, 60.0);

        let all_years = rollup_scores(&directory, &snapshots, YearFilter::All);
        assert_eq!(all_years.regions[&RegionId("r1".into())].total, 90.0);
    }

    #[test]
    fn refolding_identical_input_is_idempotent() {
        let directory = directory();
        let snapshots = vec![
            snapshot("h11", 1, AssessmentStatus::ApprovedProvincial, Some(80.0), Some(90.0)),
            snapshot("h12", 2, AssessmentStatus::ApprovedRegional, Some(60.0), Some(70.0)),
        ];
        let first = rollup_scores(&directory, &snapshots, YearFilter::All);
        let second = rollup_scores(&directory, &snapshots, YearFilter::All);
        assert_eq!(first, second);
    }

    #[test]
    fn unresolvable_units_are_counted_not_folded() {
        let directory = directory();
        let records = vec![budget("ghost", 999.0), budget("h11", 10.0)];
        let table = rollup_budgets(&directory, &records, YearFilter::All);

        assert_eq!(table.skipped, 1);
        assert_eq!(table.regions[&RegionId("r1".into())].total, 10.0);
    }
}
