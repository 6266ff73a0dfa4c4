//! CSV ingestion for yearly budget plans exported from the central planning
//! sheet. One row per (unit, category); rows group by unit and each group is
//! saved through the wholesale-replace path.

use std::collections::BTreeMap;
use std::io::Read;

use serde::{Deserialize, Deserializer};

use super::{BudgetError, BudgetRepository, BudgetService};
use crate::assessment::SecurityCategory;
use crate::hierarchy::fiscal::FiscalYear;
use crate::hierarchy::UnitId;

#[derive(Debug, thiserror::Error)]
pub enum BudgetImportError {
    #[error("csv parse failure: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: unknown category '{value}'")]
    UnknownCategory { row: usize, value: String },
    #[error("row {row}: amount '{value}' is not a number")]
    InvalidAmount { row: usize, value: String },
    #[error("unit '{unit}': {source}")]
    Plan {
        unit: String,
        #[source]
        source: BudgetError,
    },
}

#[derive(Debug, Deserialize)]
struct BudgetRow {
    #[serde(rename = "Unit")]
    unit: String,
    #[serde(rename = "Category")]
    category: String,
    #[serde(rename = "Amount", default, deserialize_with = "empty_string_as_none")]
    amount: Option<String>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

/// Parse a plan export and save one complete plan per unit for the given
/// fiscal year. Blank amounts read as zero; the planning sheet leaves cells
/// empty for categories with no allocation.
pub fn import_plans<B, R>(
    service: &BudgetService<B>,
    year: FiscalYear,
    reader: R,
) -> Result<usize, BudgetImportError>
where
    B: BudgetRepository + 'static,
    R: Read,
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut plans: BTreeMap<String, Vec<(SecurityCategory, f64)>> = BTreeMap::new();

    for (index, record) in csv_reader.deserialize::<BudgetRow>().enumerate() {
        let row_number = index + 2; // header occupies the first line
        let row = record?;

        let category = SecurityCategory::from_key(&row.category).ok_or_else(|| {
            BudgetImportError::UnknownCategory {
                row: row_number,
                value: row.category.clone(),
            }
        })?;

        let amount = match row.amount {
            None => 0.0,
            Some(raw) => raw
                .parse::<f64>()
                .map_err(|_| BudgetImportError::InvalidAmount {
                    row: row_number,
                    value: raw,
                })?,
        };

        plans.entry(row.unit).or_default().push((category, amount));
    }

    let saved = plans.len();
    for (unit, entries) in plans {
        service
            .save_plan(&UnitId(unit.clone()), year, entries)
            .map_err(|source| BudgetImportError::Plan { unit, source })?;
    }

    Ok(saved)
}
