//! Budget plans: one figure per (unit, fiscal year, category), replaced
//! wholesale per unit and year. Callers always submit the complete category
//! set; a partial set would silently drop the omitted categories.

pub mod import;

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::assessment::SecurityCategory;
use crate::hierarchy::fiscal::{FiscalYear, YearFilter};
use crate::hierarchy::UnitId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetRecord {
    pub unit: UnitId,
    pub fiscal_year: FiscalYear,
    pub category: SecurityCategory,
    pub amount: f64,
}

/// Storage abstraction for budget rows. The replace operation is
/// delete-then-insert of the full category set, not a per-row upsert.
pub trait BudgetRepository: Send + Sync {
    fn replace_for_unit_year(
        &self,
        unit: &UnitId,
        year: FiscalYear,
        records: Vec<BudgetRecord>,
    ) -> Result<(), BudgetRepositoryError>;

    fn for_year(&self, filter: YearFilter) -> Result<Vec<BudgetRecord>, BudgetRepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum BudgetRepositoryError {
    #[error("budget store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum BudgetError {
    #[error("plan is missing categories: {0}")]
    IncompletePlan(String),
    #[error("plan lists category '{0}' more than once")]
    DuplicateCategory(&'static str),
    #[error("amount for category '{0}' must be a non-negative number")]
    InvalidAmount(&'static str),
    #[error(transparent)]
    Repository(#[from] BudgetRepositoryError),
}

/// Validates and persists one unit's yearly plan.
pub struct BudgetService<B> {
    repository: Arc<B>,
}

impl<B> BudgetService<B>
where
    B: BudgetRepository + 'static,
{
    pub fn new(repository: Arc<B>) -> Self {
        Self { repository }
    }

    /// Replace the unit's plan for one fiscal year. The submitted entries
    /// must cover every category exactly once; the wholesale replace would
    /// otherwise lose data for whatever was omitted.
    pub fn save_plan(
        &self,
        unit: &UnitId,
        year: FiscalYear,
        entries: Vec<(SecurityCategory, f64)>,
    ) -> Result<(), BudgetError> {
        let mut seen = BTreeSet::new();
        for (category, amount) in &entries {
            if !seen.insert(*category) {
                return Err(BudgetError::DuplicateCategory(category.key()));
            }
            if !amount.is_finite() || *amount < 0.0 {
                return Err(BudgetError::InvalidAmount(category.key()));
            }
        }

        let missing: Vec<&'static str> = SecurityCategory::ordered()
            .into_iter()
            .filter(|category| !seen.contains(category))
            .map(SecurityCategory::key)
            .collect();
        if !missing.is_empty() {
            return Err(BudgetError::IncompletePlan(missing.join(", ")));
        }

        let records = entries
            .into_iter()
            .map(|(category, amount)| BudgetRecord {
                unit: unit.clone(),
                fiscal_year: year,
                category,
                amount,
            })
            .collect();

        self.repository.replace_for_unit_year(unit, year, records)?;
        info!(unit = %unit.0, year = %year, "budget plan replaced");
        Ok(())
    }

    pub fn for_year(&self, filter: YearFilter) -> Result<Vec<BudgetRecord>, BudgetError> {
        Ok(self.repository.for_year(filter)?)
    }
}
