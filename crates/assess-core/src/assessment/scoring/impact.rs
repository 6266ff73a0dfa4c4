use serde::{Deserialize, Serialize};

/// Severity of a reported data breach, with its fixed penalty on the legacy
/// 0–15 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreachSeverity {
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl BreachSeverity {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::None,
            Self::Low,
            Self::Medium,
            Self::High,
            Self::Critical,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }

    const fn penalty_magnitude(self) -> i8 {
        match self {
            Self::None => 0,
            Self::Low => 2,
            Self::Medium => 5,
            Self::High => 8,
            Self::Critical => 15,
        }
    }
}

/// Structured incident and breach facts for one assessment cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpactFacts {
    pub had_incident: bool,
    pub recovery_hours: u32,
    pub had_breach: bool,
    pub breach_severity: BreachSeverity,
}

impl ImpactFacts {
    /// A cycle with no adverse events; both components score their maximum.
    pub const fn clean() -> Self {
        Self {
            had_incident: false,
            recovery_hours: 0,
            had_breach: false,
            breach_severity: BreachSeverity::None,
        }
    }
}

const LEGACY_BASE: i16 = 15;
const COMPONENT_MAX: f64 = 50.0;

/// Incident penalty as a step function of recovery hours, on the legacy
/// scale. `recovery_hours == 0` with `had_incident` set scores as no
/// incident: zero hours is the data-entry default for an unfilled field.
pub fn incident_penalty(had_incident: bool, recovery_hours: u32) -> i8 {
    if !had_incident || recovery_hours == 0 {
        return 0;
    }
    match recovery_hours {
        1..=4 => -2,
        5..=24 => -5,
        25..=72 => -8,
        _ => -15,
    }
}

/// Breach penalty from the fixed severity table, on the legacy scale.
pub fn breach_penalty(had_breach: bool, severity: BreachSeverity) -> i8 {
    if !had_breach {
        return 0;
    }
    -severity.penalty_magnitude()
}

fn legacy_total(facts: &ImpactFacts) -> u8 {
    let total = LEGACY_BASE
        + i16::from(incident_penalty(facts.had_incident, facts.recovery_hours))
        + i16::from(breach_penalty(facts.had_breach, facts.breach_severity));
    total.max(0) as u8
}

fn component_from_penalty(penalty: i8) -> f64 {
    let remaining = (LEGACY_BASE + i16::from(penalty)).max(0);
    COMPONENT_MAX * f64::from(remaining) / f64::from(LEGACY_BASE)
}

/// Penalty-adjusted impact score. Two schema generations coexist in stored
/// data; the two-component percentage form is the system of record, and
/// legacy rows are converted through [`ImpactScore::normalized`] before any
/// aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "schema", rename_all = "snake_case")]
pub enum ImpactScore {
    /// Historical 0–15 penalty scale.
    Legacy { facts: ImpactFacts, total: u8 },
    /// Canonical 0–100 scale: service-continuity and data-protection
    /// components of 0–50 each, defaulting to the maximum when no adverse
    /// event occurred.
    TwoComponent {
        facts: ImpactFacts,
        continuity: f64,
        protection: f64,
    },
}

impl ImpactScore {
    /// Score facts on the canonical two-component scale.
    pub fn from_facts(facts: ImpactFacts) -> Self {
        let continuity = component_from_penalty(incident_penalty(
            facts.had_incident,
            facts.recovery_hours,
        ));
        let protection = component_from_penalty(breach_penalty(
            facts.had_breach,
            facts.breach_severity,
        ));
        Self::TwoComponent {
            facts,
            continuity,
            protection,
        }
    }

    /// Score facts on the historical 0–15 scale.
    pub fn legacy_from_facts(facts: ImpactFacts) -> Self {
        Self::Legacy {
            total: legacy_total(&facts),
            facts,
        }
    }

    pub fn facts(&self) -> &ImpactFacts {
        match self {
            Self::Legacy { facts, .. } | Self::TwoComponent { facts, .. } => facts,
        }
    }

    /// The score on the canonical 0–100 scale. This is the only value the
    /// aggregation layer is allowed to consume; mixing raw scales across
    /// schema generations would corrupt averages.
    pub fn normalized(&self) -> f64 {
        match self {
            Self::Legacy { total, .. } => {
                f64::from(*total) / f64::from(LEGACY_BASE) * 100.0
            }
            Self::TwoComponent {
                continuity,
                protection,
                ..
            } => continuity + protection,
        }
    }
}
