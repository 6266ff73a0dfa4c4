//! Drill-down navigation over the pre-folded roll-up structure. Every step
//! down is gated by the access policy: a rejected target is an error, not
//! merely a hidden row, even when the underlying data was already fetched.
//! Stepping back is refused at the profile's pinned home level.

use serde::Serialize;

use crate::access::{AccessPolicy, DrillLevel, Profile, Scope};
use crate::hierarchy::{HierarchyDirectory, ProvinceId, RegionId, UnitId};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DrillError {
    #[error("'{0}' is not visible to the caller")]
    AccessDenied(String),
    #[error("'{0}' does not exist under the current position")]
    UnknownTarget(String),
    #[error("already at the role's home level")]
    AtHomeLevel,
    #[error("cannot enter a {target} from the {current} view", target = .target.label(), current = .current.label())]
    WrongLevel {
        current: DrillLevel,
        target: DrillLevel,
    },
}

/// Current navigation position. One level is entered or left at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrillPath {
    region: Option<RegionId>,
    province: Option<ProvinceId>,
    unit: Option<UnitId>,
}

impl DrillPath {
    /// Starting position for a profile: the path segments its scope pins.
    pub fn start_for(profile: &Profile, directory: &HierarchyDirectory) -> Self {
        match &profile.scope {
            Scope::National => Self {
                region: None,
                province: None,
                unit: None,
            },
            Scope::Region(region) => Self {
                region: Some(region.clone()),
                province: None,
                unit: None,
            },
            Scope::Province(province) => Self {
                region: directory
                    .province(province)
                    .map(|row| row.region.clone()),
                province: Some(province.clone()),
                unit: None,
            },
            Scope::Unit(unit) => {
                let chain = directory.ancestry(unit);
                Self {
                    region: chain.as_ref().map(|c| c.region.id.clone()),
                    province: chain.as_ref().map(|c| c.province.id.clone()),
                    unit: Some(unit.clone()),
                }
            }
        }
    }

    pub fn level(&self) -> DrillLevel {
        match (&self.region, &self.province, &self.unit) {
            (None, _, _) => DrillLevel::Regions,
            (Some(_), None, _) => DrillLevel::Provinces,
            (Some(_), Some(_), None) => DrillLevel::Units,
            (Some(_), Some(_), Some(_)) => DrillLevel::Categories,
        }
    }

    pub fn region(&self) -> Option<&RegionId> {
        self.region.as_ref()
    }

    pub fn province(&self) -> Option<&ProvinceId> {
        self.province.as_ref()
    }

    pub fn unit(&self) -> Option<&UnitId> {
        self.unit.as_ref()
    }

    pub fn enter_region(
        &mut self,
        profile: &Profile,
        directory: &HierarchyDirectory,
        region: RegionId,
    ) -> Result<DrillLevel, DrillError> {
        if self.level() != DrillLevel::Regions {
            return Err(DrillError::WrongLevel {
                current: self.level(),
                target: DrillLevel::Provinces,
            });
        }
        if directory.region(&region).is_none() {
            return Err(DrillError::UnknownTarget(region.0));
        }
        let policy = AccessPolicy::new(directory);
        if !policy.can_view_region(profile, &region) {
            return Err(DrillError::AccessDenied(region.0));
        }
        self.region = Some(region);
        Ok(self.level())
    }

    pub fn enter_province(
        &mut self,
        profile: &Profile,
        directory: &HierarchyDirectory,
        province: ProvinceId,
    ) -> Result<DrillLevel, DrillError> {
        if self.level() != DrillLevel::Provinces {
            return Err(DrillError::WrongLevel {
                current: self.level(),
                target: DrillLevel::Units,
            });
        }
        let Some(row) = directory.province(&province) else {
            return Err(DrillError::UnknownTarget(province.0));
        };
        if Some(&row.region) != self.region.as_ref() {
            return Err(DrillError::UnknownTarget(province.0));
        }
        let policy = AccessPolicy::new(directory);
        if !policy.can_view_province(profile, &province) {
            return Err(DrillError::AccessDenied(province.0));
        }
        self.province = Some(province);
        Ok(self.level())
    }

    pub fn enter_unit(
        &mut self,
        profile: &Profile,
        directory: &HierarchyDirectory,
        unit: UnitId,
    ) -> Result<DrillLevel, DrillError> {
        if self.level() != DrillLevel::Units {
            return Err(DrillError::WrongLevel {
                current: self.level(),
                target: DrillLevel::Categories,
            });
        }
        let Some(row) = directory.unit(&unit) else {
            return Err(DrillError::UnknownTarget(unit.0));
        };
        if Some(&row.province) != self.province.as_ref() {
            return Err(DrillError::UnknownTarget(unit.0));
        }
        let policy = AccessPolicy::new(directory);
        if !policy.can_view_unit(profile, &unit) {
            return Err(DrillError::AccessDenied(unit.0));
        }
        self.unit = Some(unit);
        Ok(self.level())
    }

    /// Undo exactly one drill step. Refused once the path is back at the
    /// profile's home level; a provincial approver never sees region rows.
    pub fn back(&mut self, profile: &Profile) -> Result<DrillLevel, DrillError> {
        if self.level() <= AccessPolicy::home_level(profile) {
            return Err(DrillError::AtHomeLevel);
        }
        match self.level() {
            DrillLevel::Categories => self.unit = None,
            DrillLevel::Units => self.province = None,
            DrillLevel::Provinces => self.region = None,
            DrillLevel::Regions => return Err(DrillError::AtHomeLevel),
        }
        Ok(self.level())
    }
}
