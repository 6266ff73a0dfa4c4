//! Static organizational hierarchy: health regions, provinces, and the
//! facilities/health-offices that own assessments and budgets.

pub mod fiscal;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProvinceId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    Hospital,
    HealthOffice,
}

impl UnitKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Hospital => "Hospital",
            Self::HealthOffice => "Health Office",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthRegion {
    pub id: RegionId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Province {
    pub id: ProvinceId,
    pub name: String,
    pub region: RegionId,
}

/// Leaf node of the hierarchy; owns assessments and budget plans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationalUnit {
    pub id: UnitId,
    pub name: String,
    pub kind: UnitKind,
    pub province: ProvinceId,
}

/// The exactly-one ancestor chain of a unit.
#[derive(Debug, Clone, Copy)]
pub struct UnitAncestry<'a> {
    pub unit: &'a OrganizationalUnit,
    pub province: &'a Province,
    pub region: &'a HealthRegion,
}

#[derive(Debug, thiserror::Error)]
pub enum HierarchyError {
    #[error("duplicate identifier '{0}' in hierarchy definition")]
    DuplicateId(String),
    #[error("province '{province}' references unknown region '{region}'")]
    UnknownRegion { province: String, region: String },
    #[error("unit '{unit}' references unknown province '{province}'")]
    UnknownProvince { unit: String, province: String },
}

/// Immutable index over the organizational tree. Built once per data refresh
/// and shared read-only; every lookup the policy and reporting layers need
/// is resolved here instead of re-walking raw rows.
#[derive(Debug, Clone, Default)]
pub struct HierarchyDirectory {
    regions: HashMap<RegionId, HealthRegion>,
    provinces: HashMap<ProvinceId, Province>,
    units: HashMap<UnitId, OrganizationalUnit>,
    region_provinces: HashMap<RegionId, Vec<ProvinceId>>,
    province_units: HashMap<ProvinceId, Vec<UnitId>>,
}

impl HierarchyDirectory {
    pub fn build(
        regions: Vec<HealthRegion>,
        provinces: Vec<Province>,
        units: Vec<OrganizationalUnit>,
    ) -> Result<Self, HierarchyError> {
        let mut directory = Self::default();

        for region in regions {
            if directory.regions.contains_key(&region.id) {
                return Err(HierarchyError::DuplicateId(region.id.0));
            }
            directory.region_provinces.entry(region.id.clone()).or_default();
            directory.regions.insert(region.id.clone(), region);
        }

        for province in provinces {
            if directory.provinces.contains_key(&province.id) {
                return Err(HierarchyError::DuplicateId(province.id.0));
            }
            if !directory.regions.contains_key(&province.region) {
                return Err(HierarchyError::UnknownRegion {
                    province: province.id.0,
                    region: province.region.0,
                });
            }
            directory
                .region_provinces
                .entry(province.region.clone())
                .or_default()
                .push(province.id.clone());
            directory.province_units.entry(province.id.clone()).or_default();
            directory.provinces.insert(province.id.clone(), province);
        }

        for unit in units {
            if directory.units.contains_key(&unit.id) {
                return Err(HierarchyError::DuplicateId(unit.id.0));
            }
            if !directory.provinces.contains_key(&unit.province) {
                return Err(HierarchyError::UnknownProvince {
                    unit: unit.id.0,
                    province: unit.province.0,
                });
            }
            directory
                .province_units
                .entry(unit.province.clone())
                .or_default()
                .push(unit.id.clone());
            directory.units.insert(unit.id.clone(), unit);
        }

        for provinces in directory.region_provinces.values_mut() {
            provinces.sort();
        }
        for units in directory.province_units.values_mut() {
            units.sort();
        }

        Ok(directory)
    }

    pub fn region(&self, id: &RegionId) -> Option<&HealthRegion> {
        self.regions.get(id)
    }

    pub fn province(&self, id: &ProvinceId) -> Option<&Province> {
        self.provinces.get(id)
    }

    pub fn unit(&self, id: &UnitId) -> Option<&OrganizationalUnit> {
        self.units.get(id)
    }

    /// Resolve the unit → province → region chain. `None` only when a row
    /// references identifiers the directory does not know about.
    pub fn ancestry(&self, id: &UnitId) -> Option<UnitAncestry<'_>> {
        let unit = self.units.get(id)?;
        let province = self.provinces.get(&unit.province)?;
        let region = self.regions.get(&province.region)?;
        Some(UnitAncestry {
            unit,
            province,
            region,
        })
    }

    /// Region identifiers in stable (sorted) order for deterministic views.
    pub fn region_ids(&self) -> Vec<RegionId> {
        let mut ids: Vec<RegionId> = self.regions.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn provinces_in(&self, region: &RegionId) -> &[ProvinceId] {
        self.region_provinces
            .get(region)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn units_in(&self, province: &ProvinceId) -> &[UnitId] {
        self.province_units
            .get(province)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> HierarchyDirectory {
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
                    region: RegionId("r1".into()),
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
                    id: UnitId("o1".into()),
                    name: "District Health Office".into(),
                    kind: UnitKind::HealthOffice,
                    province: ProvinceId("p1".into()),
                },
            ],
        )
        .expect("sample hierarchy builds")
    }

    #[test]
    fn ancestry_walks_unit_to_region() {
        let directory = sample();
        let chain = directory
            .ancestry(&UnitId("h1".into()))
            .expect("ancestry resolves");
        assert_eq!(chain.province.id, ProvinceId("p1".into()));
        assert_eq!(chain.region.id, RegionId("r1".into()));
    }

    #[test]
    fn build_rejects_unit_with_unknown_province() {
        let result = HierarchyDirectory::build(
            Vec::new(),
            Vec::new(),
            vec![OrganizationalUnit {
                id: UnitId("h9".into()),
                name: "Orphan Hospital".into(),
                kind: UnitKind::Hospital,
                province: ProvinceId("missing".into()),
            }],
        );
        assert!(matches!(
            result,
            Err(HierarchyError::UnknownProvince { .. })
        ));
    }

    #[test]
    fn build_rejects_duplicate_identifiers() {
        let region = HealthRegion {
            id: RegionId("r1".into()),
            name: "Region".into(),
        };
        let result = HierarchyDirectory::build(vec![region.clone(), region], Vec::new(), Vec::new());
        assert!(matches!(result, Err(HierarchyError::DuplicateId(_))));
    }

    #[test]
    fn listings_are_sorted_for_stable_views() {
        let directory = sample();
        let units = directory.units_in(&ProvinceId("p1".into()));
        assert_eq!(units, &[UnitId("h1".into()), UnitId("o1".into())]);
        assert_eq!(
            directory.provinces_in(&RegionId("r1".into())),
            &[ProvinceId("p1".into()), ProvinceId("p2".into())]
        );
        assert!(directory.provinces_in(&RegionId("r2".into())).is_empty());
    }
}
