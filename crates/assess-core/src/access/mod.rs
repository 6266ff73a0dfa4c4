//! Role and scope model, and the single policy module every other component
//! queries for organizational visibility.

use serde::{Deserialize, Serialize};

use crate::hierarchy::{HierarchyDirectory, ProvinceId, RegionId, UnitId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    FacilityIt,
    HealthOfficeIt,
    ProvincialApprover,
    RegionalApprover,
    RegionalSupervisor,
    CentralAdmin,
}

impl Role {
    pub const fn ordered() -> [Self; 6] {
        [
            Self::FacilityIt,
            Self::HealthOfficeIt,
            Self::ProvincialApprover,
            Self::RegionalApprover,
            Self::RegionalSupervisor,
            Self::CentralAdmin,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::FacilityIt => "Facility IT",
            Self::HealthOfficeIt => "Health Office IT",
            Self::ProvincialApprover => "Provincial Approver",
            Self::RegionalApprover => "Regional Approver",
            Self::RegionalSupervisor => "Regional Supervisor",
            Self::CentralAdmin => "Central Administrator",
        }
    }
}

/// Organizational scope of a profile. Exactly one variant is valid per role;
/// the backing columns (`hospital_id`, `province_id`, `health_region_id`)
/// are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "level", content = "id")]
pub enum Scope {
    Unit(UnitId),
    Province(ProvinceId),
    Region(RegionId),
    National,
}

#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("role {role:?} cannot carry scope {scope:?}")]
    ScopeMismatch { role: Role, scope: Scope },
}

/// Authenticated identity handed to the core by the session layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    pub display_name: String,
    pub role: Role,
    pub scope: Scope,
}

impl Profile {
    /// Build a profile, enforcing the role/scope pairing invariant.
    pub fn new(
        user_id: impl Into<String>,
        display_name: impl Into<String>,
        role: Role,
        scope: Scope,
    ) -> Result<Self, AccessError> {
        let valid = matches!(
            (role, &scope),
            (Role::FacilityIt, Scope::Unit(_))
                | (Role::HealthOfficeIt, Scope::Unit(_))
                | (Role::ProvincialApprover, Scope::Province(_))
                | (Role::RegionalApprover, Scope::Region(_))
                | (Role::RegionalSupervisor, Scope::Region(_))
                | (Role::CentralAdmin, Scope::National)
        );
        if !valid {
            return Err(AccessError::ScopeMismatch { role, scope });
        }
        Ok(Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            role,
            scope,
        })
    }
}

/// Drill-down depth in report navigation. Also the anchor for role pinning:
/// a profile can never navigate above its home level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrillLevel {
    Regions,
    Provinces,
    Units,
    Categories,
}

impl DrillLevel {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Regions => "Regions",
            Self::Provinces => "Provinces",
            Self::Units => "Units",
            Self::Categories => "Categories",
        }
    }
}

/// Pure visibility predicate over the organizational hierarchy.
#[derive(Debug, Clone, Copy)]
pub struct AccessPolicy<'a> {
    directory: &'a HierarchyDirectory,
}

impl<'a> AccessPolicy<'a> {
    pub fn new(directory: &'a HierarchyDirectory) -> Self {
        Self { directory }
    }

    pub fn can_view_unit(&self, profile: &Profile, unit: &UnitId) -> bool {
        let Some(chain) = self.directory.ancestry(unit) else {
            return false;
        };
        match &profile.scope {
            Scope::Unit(own) => own == unit,
            Scope::Province(own) => *own == chain.province.id,
            Scope::Region(own) => *own == chain.region.id,
            Scope::National => true,
        }
    }

    pub fn can_view_province(&self, profile: &Profile, province: &ProvinceId) -> bool {
        let Some(row) = self.directory.province(province) else {
            return false;
        };
        match &profile.scope {
            Scope::Unit(own) => self
                .directory
                .unit(own)
                .is_some_and(|unit| unit.province == *province),
            Scope::Province(own) => own == province,
            Scope::Region(own) => *own == row.region,
            Scope::National => true,
        }
    }

    pub fn can_view_region(&self, profile: &Profile, region: &RegionId) -> bool {
        if self.directory.region(region).is_none() {
            return false;
        }
        match &profile.scope {
            Scope::Unit(own) => self
                .directory
                .ancestry(own)
                .is_some_and(|chain| chain.region.id == *region),
            Scope::Province(own) => self
                .directory
                .province(own)
                .is_some_and(|row| row.region == *region),
            Scope::Region(own) => own == region,
            Scope::National => true,
        }
    }

    /// Materialized unit filter consumed by the aggregation engine.
    pub fn visible_units(&self, profile: &Profile) -> Vec<UnitId> {
        match &profile.scope {
            Scope::Unit(own) => self
                .directory
                .unit(own)
                .map(|unit| vec![unit.id.clone()])
                .unwrap_or_default(),
            Scope::Province(own) => self.directory.units_in(own).to_vec(),
            Scope::Region(own) => self
                .directory
                .provinces_in(own)
                .iter()
                .flat_map(|province| self.directory.units_in(province).iter().cloned())
                .collect(),
            Scope::National => {
                let mut units: Vec<UnitId> = self
                    .directory
                    .region_ids()
                    .iter()
                    .flat_map(|region| self.directory.provinces_in(region).iter())
                    .flat_map(|province| self.directory.units_in(province).iter().cloned())
                    .collect();
                units.sort();
                units
            }
        }
    }

    /// The drill level a profile starts at and may never navigate above.
    pub fn home_level(profile: &Profile) -> DrillLevel {
        match profile.scope {
            Scope::National => DrillLevel::Regions,
            Scope::Region(_) => DrillLevel::Provinces,
            Scope::Province(_) => DrillLevel::Units,
            Scope::Unit(_) => DrillLevel::Categories,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::{HealthRegion, OrganizationalUnit, Province, UnitKind};

    fn directory() -> HierarchyDirectory {
        HierarchyDirectory::build(
            vec![
                HealthRegion {
                    id: RegionId("r1".into()),
                    name: "Region One".into(),
                },
                HealthRegion {
                    id: RegionId("r2".into()),
                    name: "Region Two".into(),
                },
            ],
            vec![
                Province {
                    id: ProvinceId("p1".into()),
                    name: "Province One".into(),
                    region: RegionId("r1".into()),
                },
                Province {
                    id: ProvinceId("p2".into()),
                    name: "Province Two".into(),
                    region: RegionId("r2".into()),
                },
            ],
            vec![
                OrganizationalUnit {
                    id: UnitId("h1".into()),
                    name: "General Hospital".into(),
                    kind: UnitKind::Hospital,
                    province: ProvinceId("p1".into()),
                },
                OrganizationalUnit {
                    id: UnitId("h2".into()),
                    name: "Provincial Hospital".into(),
                    kind: UnitKind::Hospital,
                    province: ProvinceId("p2".into()),
                },
            ],
        )
        .expect("directory builds")
    }

    fn provincial_approver(province: &str) -> Profile {
        Profile::new(
            "u-prov",
            "Provincial Approver",
            Role::ProvincialApprover,
            Scope::Province(ProvinceId(province.into())),
        )
        .expect("valid profile")
    }

    #[test]
    fn profile_rejects_mismatched_scope() {
        let result = Profile::new(
            "u1",
            "Facility User",
            Role::FacilityIt,
            Scope::Province(ProvinceId("p1".into())),
        );
        assert!(matches!(result, Err(AccessError::ScopeMismatch { .. })));
    }

    #[test]
    fn province_scope_sees_only_its_units() {
        let directory = directory();
        let policy = AccessPolicy::new(&directory);
        let profile = provincial_approver("p1");

        assert!(policy.can_view_unit(&profile, &UnitId("h1".into())));
        assert!(!policy.can_view_unit(&profile, &UnitId("h2".into())));
        assert_eq!(policy.visible_units(&profile), vec![UnitId("h1".into())]);
    }

    #[test]
    fn unit_scope_sees_own_ancestors_but_no_siblings() {
        let directory = directory();
        let policy = AccessPolicy::new(&directory);
        let profile = Profile::new(
            "u-fac",
            "Facility IT",
            Role::FacilityIt,
            Scope::Unit(UnitId("h1".into())),
        )
        .expect("valid profile");

        assert!(policy.can_view_province(&profile, &ProvinceId("p1".into())));
        assert!(policy.can_view_region(&profile, &RegionId("r1".into())));
        assert!(!policy.can_view_region(&profile, &RegionId("r2".into())));
    }

    #[test]
    fn national_scope_sees_everything() {
        let directory = directory();
        let policy = AccessPolicy::new(&directory);
        let profile = Profile::new("u-admin", "Admin", Role::CentralAdmin, Scope::National)
            .expect("valid profile");

        assert_eq!(policy.visible_units(&profile).len(), directory.unit_count());
        assert!(policy.can_view_region(&profile, &RegionId("r2".into())));
    }

    #[test]
    fn home_levels_pin_roles_to_their_tier() {
        let admin = Profile::new("a", "A", Role::CentralAdmin, Scope::National).expect("valid");
        let provincial = provincial_approver("p1");
        assert_eq!(AccessPolicy::home_level(&admin), DrillLevel::Regions);
        assert_eq!(AccessPolicy::home_level(&provincial), DrillLevel::Units);
    }

    #[test]
    fn unknown_targets_are_never_visible() {
        let directory = directory();
        let policy = AccessPolicy::new(&directory);
        let admin = Profile::new("a", "A", Role::CentralAdmin, Scope::National).expect("valid");
        assert!(!policy.can_view_unit(&admin, &UnitId("ghost".into())));
        assert!(!policy.can_view_province(&admin, &ProvinceId("ghost".into())));
    }
}
