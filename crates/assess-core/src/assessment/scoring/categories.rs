use serde::{Deserialize, Serialize};

use crate::assessment::domain::AssessmentItem;

/// Assessed security domains. Weights are fixed business constants that sum
/// to the documented maximum of 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityCategory {
    AccessControl,
    NetworkSecurity,
    DataProtection,
    BackupRecovery,
    IncidentResponse,
    PhysicalSecurity,
    SecurityAwareness,
}

impl SecurityCategory {
    pub const fn ordered() -> [Self; 7] {
        [
            Self::AccessControl,
            Self::NetworkSecurity,
            Self::DataProtection,
            Self::BackupRecovery,
            Self::IncidentResponse,
            Self::PhysicalSecurity,
            Self::SecurityAwareness,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::AccessControl => "Access Control",
            Self::NetworkSecurity => "Network Security",
            Self::DataProtection => "Data Protection",
            Self::BackupRecovery => "Backup & Recovery",
            Self::IncidentResponse => "Incident Response",
            Self::PhysicalSecurity => "Physical Security",
            Self::SecurityAwareness => "Security Awareness",
        }
    }

    pub const fn key(self) -> &'static str {
        match self {
            Self::AccessControl => "access_control",
            Self::NetworkSecurity => "network_security",
            Self::DataProtection => "data_protection",
            Self::BackupRecovery => "backup_recovery",
            Self::IncidentResponse => "incident_response",
            Self::PhysicalSecurity => "physical_security",
            Self::SecurityAwareness => "security_awareness",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ordered()
            .into_iter()
            .find(|category| category.key() == key.trim())
    }

    /// Fixed weight of this category toward the 100-point assessment total.
    pub const fn weight(self) -> u8 {
        match self {
            Self::AccessControl => 20,
            Self::NetworkSecurity => 15,
            Self::DataProtection => 15,
            Self::BackupRecovery => 15,
            Self::IncidentResponse => 15,
            Self::PhysicalSecurity => 10,
            Self::SecurityAwareness => 10,
        }
    }
}

/// Review outcome for one line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pass,
    Partial,
    Fail,
}

impl ItemStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pass => "Pass",
            Self::Partial => "Partial",
            Self::Fail => "Fail",
        }
    }

    pub const fn factor(self) -> f64 {
        match self {
            Self::Pass => 1.0,
            Self::Partial => 0.5,
            Self::Fail => 0.0,
        }
    }
}

pub fn item_score(category: SecurityCategory, status: ItemStatus) -> f64 {
    f64::from(category.weight()) * status.factor()
}

/// Weighted total over one assessment's line items. With the bulk-created
/// one-item-per-category set this tops out at 100.
pub fn assessment_total(items: &[AssessmentItem]) -> f64 {
    items
        .iter()
        .map(|item| item_score(item.category, item.status))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_sum_to_documented_maximum() {
        let sum: u32 = SecurityCategory::ordered()
            .into_iter()
            .map(|category| u32::from(category.weight()))
            .sum();
        assert_eq!(sum, 100);
    }

    #[test]
    fn partial_items_score_half_the_weight() {
        assert_eq!(
            item_score(SecurityCategory::AccessControl, ItemStatus::Partial),
            10.0
        );
        assert_eq!(
            item_score(SecurityCategory::PhysicalSecurity, ItemStatus::Pass),
            10.0
        );
        assert_eq!(
            item_score(SecurityCategory::NetworkSecurity, ItemStatus::Fail),
            0.0
        );
    }

    #[test]
    fn category_keys_round_trip() {
        for category in SecurityCategory::ordered() {
            assert_eq!(SecurityCategory::from_key(category.key()), Some(category));
        }
        assert_eq!(SecurityCategory::from_key("unknown"), None);
    }
}
