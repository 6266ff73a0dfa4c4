use serde::Serialize;

use crate::access::DrillLevel;
use crate::assessment::{Assessment, ItemStatus, SecurityCategory};

/// One row of a drill-down table: a region, province, or unit with its
/// folded figures.
#[derive(Debug, Clone, Serialize)]
pub struct RollupRowView {
    pub key: String,
    pub name: String,
    pub total: f64,
    pub units_assessed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average: Option<f64>,
}

/// Category-level detail for one unit's latest qualifying assessment.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryRowView {
    pub category: SecurityCategory,
    pub category_label: &'static str,
    pub weight: u8,
    pub status: ItemStatus,
    pub status_label: &'static str,
    pub score: f64,
}

impl CategoryRowView {
    pub fn rows_for(assessment: &Assessment) -> Vec<Self> {
        let mut rows: Vec<Self> = assessment
            .items
            .iter()
            .map(|item| Self {
                category: item.category,
                category_label: item.category.label(),
                weight: item.category.weight(),
                status: item.status,
                status_label: item.status.label(),
                score: item.score,
            })
            .collect();
        rows.sort_by_key(|row| row.category);
        rows
    }
}

/// A rendered drill-down level: position, rows, and the level label.
#[derive(Debug, Clone, Serialize)]
pub struct CoverageReportView {
    pub level: DrillLevel,
    pub level_label: &'static str,
    pub rows: Vec<RollupRowView>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub category_rows: Vec<CategoryRowView>,
}
