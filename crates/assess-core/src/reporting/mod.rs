//! Hierarchical aggregation of scores and budget figures with drill-down
//! navigation. Folded tables are read-only snapshots recomputed from scratch
//! on each refresh; nothing here mutates incrementally across views.

pub mod drilldown;
pub mod rollup;
pub mod views;

pub use drilldown::{DrillError, DrillPath};
pub use rollup::{
    latest_qualifying, rollup_budgets, rollup_impact, rollup_scores, AssessmentSnapshot, Bucket,
    RollupTable,
};
pub use views::{CategoryRowView, CoverageReportView, RollupRowView};

use crate::access::DrillLevel;
use crate::hierarchy::HierarchyDirectory;

/// Render one level of a folded table at the given drill position. The view
/// reads exactly one level of the pre-folded structure; deeper levels stay
/// untouched until the caller drills further.
pub fn level_rows(
    directory: &HierarchyDirectory,
    table: &RollupTable,
    path: &DrillPath,
) -> Vec<RollupRowView> {
    match path.level() {
        DrillLevel::Regions => directory
            .region_ids()
            .into_iter()
            .filter_map(|region_id| {
                let region = directory.region(&region_id)?;
                let bucket = table.regions.get(&region_id).cloned().unwrap_or_default();
                Some(row_view(region_id.0.clone(), region.name.clone(), &bucket))
            })
            .collect(),
        DrillLevel::Provinces => {
            let Some(region) = path.region() else {
                return Vec::new();
            };
            directory
                .provinces_in(region)
                .iter()
                .filter_map(|province_id| {
                    let province = directory.province(province_id)?;
                    let bucket = table
                        .provinces
                        .get(province_id)
                        .cloned()
                        .unwrap_or_default();
                    Some(row_view(
                        province_id.0.clone(),
                        province.name.clone(),
                        &bucket,
                    ))
                })
                .collect()
        }
        DrillLevel::Units | DrillLevel::Categories => {
            let Some(province) = path.province() else {
                return Vec::new();
            };
            directory
                .units_in(province)
                .iter()
                .filter_map(|unit_id| {
                    let unit = directory.unit(unit_id)?;
                    let bucket = table.units.get(unit_id).cloned().unwrap_or_default();
                    Some(row_view(unit_id.0.clone(), unit.name.clone(), &bucket))
                })
                .collect()
        }
    }
}

fn row_view(key: String, name: String, bucket: &Bucket) -> RollupRowView {
    RollupRowView {
        key,
        name,
        total: bucket.total,
        units_assessed: bucket.unit_count(),
        average: bucket.average(),
    }
}
