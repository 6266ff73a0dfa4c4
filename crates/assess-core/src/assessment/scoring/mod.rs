//! Deterministic scoring: weighted category totals and the penalty-adjusted
//! impact score. Pure functions, no I/O; given identical inputs the output
//! is always identical.

mod categories;
mod impact;

pub use categories::{assessment_total, item_score, ItemStatus, SecurityCategory};
pub use impact::{
    breach_penalty, incident_penalty, BreachSeverity, ImpactFacts, ImpactScore,
};
