use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use axum::http::StatusCode;
use axum::response::Response;
use serde_json::Value;

use crate::access::{Profile, Role, Scope};
use crate::assessment::domain::{ApprovalHistory, Assessment, AssessmentId, AssessmentStatus};
use crate::assessment::repository::{
    ApprovalLedger, AssessmentRepository, LedgerError, RepositoryError,
};
use crate::assessment::service::AssessmentWorkflowService;
use crate::assessment::workflow::WorkflowRules;
use crate::hierarchy::fiscal::YearFilter;
use crate::hierarchy::{
    HealthRegion, HierarchyDirectory, OrganizationalUnit, Province, ProvinceId, RegionId, UnitId,
    UnitKind,
};

pub(super) fn directory() -> Arc<HierarchyDirectory> {
    let directory = HierarchyDirectory::build(
        vec![
            HealthRegion {
                id: RegionId("r1".into()),
                name: "Northern Region".into(),
            },
            HealthRegion {
                id: RegionId("r2".into()),
                name: "Southern Region".into(),
            },
        ],
        vec![
            Province {
                id: ProvinceId("p1".into()),
                name: "River Province".into(),
                region: RegionId("r1".into()),
            },
            Province {
                id: ProvinceId("p2".into()),
                name: "Coastal Province".into(),
                region: RegionId("r2".into()),
            },
        ],
        vec![
            OrganizationalUnit {
                id: UnitId("h1".into()),
                name: "River General Hospital".into(),
                kind: UnitKind::Hospital,
                province: ProvinceId("p1".into()),
            },
            OrganizationalUnit {
                id: UnitId("h2".into()),
                name: "Coastal Hospital".into(),
                kind: UnitKind::Hospital,
                province: ProvinceId("p2".into()),
            },
        ],
    )
    .expect("test hierarchy builds");
    Arc::new(directory)
}

pub(super) fn facility_actor() -> Profile {
    Profile::new(
        "u-facility",
        "Facility IT",
        Role::FacilityIt,
        Scope::Unit(UnitId("h1".into())),
    )
    .expect("valid profile")
}

pub(super) fn provincial_actor() -> Profile {
    Profile::new(
        "u-provincial",
        "Provincial Approver",
        Role::ProvincialApprover,
        Scope::Province(ProvinceId("p1".into())),
    )
    .expect("valid profile")
}

pub(super) fn other_provincial_actor() -> Profile {
    Profile::new(
        "u-provincial-2",
        "Coastal Approver",
        Role::ProvincialApprover,
        Scope::Province(ProvinceId("p2".into())),
    )
    .expect("valid profile")
}

pub(super) fn regional_actor() -> Profile {
    Profile::new(
        "u-regional",
        "Regional Approver",
        Role::RegionalApprover,
        Scope::Region(RegionId("r1".into())),
    )
    .expect("valid profile")
}

pub(super) fn central_actor() -> Profile {
    Profile::new("u-central", "Central Admin", Role::CentralAdmin, Scope::National)
        .expect("valid profile")
}

#[derive(Default)]
pub(super) struct MemoryAssessmentRepository {
    records: Mutex<HashMap<AssessmentId, Assessment>>,
    sequence: AtomicU64,
}

impl AssessmentRepository for MemoryAssessmentRepository {
    fn insert(&self, assessment: Assessment) -> Result<Assessment, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&assessment.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(assessment.id.clone(), assessment.clone());
        Ok(assessment)
    }

    fn update_if_status(
        &self,
        expected: AssessmentStatus,
        assessment: Assessment,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let stored = guard
            .get(&assessment.id)
            .ok_or(RepositoryError::NotFound)?;
        if stored.status != expected {
            return Err(RepositoryError::StaleStatus);
        }
        guard.insert(assessment.id.clone(), assessment);
        Ok(())
    }

    fn fetch(&self, id: &AssessmentId) -> Result<Option<Assessment>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn list(&self, filter: YearFilter) -> Result<Vec<Assessment>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|assessment| filter.matches(assessment.fiscal_year))
            .cloned()
            .collect())
    }

    fn next_sequence(&self) -> Result<u64, RepositoryError> {
        Ok(self.sequence.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

impl MemoryAssessmentRepository {
    /// Test hook simulating a concurrent writer flipping the stored status.
    pub(super) fn force_status(&self, id: &AssessmentId, status: AssessmentStatus) {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if let Some(assessment) = guard.get_mut(id) {
            assessment.status = status;
        }
    }
}

#[derive(Default)]
pub(super) struct MemoryLedger {
    entries: Mutex<Vec<ApprovalHistory>>,
}

impl MemoryLedger {
    pub(super) fn entries(&self) -> Vec<ApprovalHistory> {
        self.entries.lock().expect("ledger mutex poisoned").clone()
    }
}

impl ApprovalLedger for MemoryLedger {
    fn append(&self, entry: ApprovalHistory) -> Result<(), LedgerError> {
        self.entries
            .lock()
            .expect("ledger mutex poisoned")
            .push(entry);
        Ok(())
    }

    fn for_assessment(&self, id: &AssessmentId) -> Result<Vec<ApprovalHistory>, LedgerError> {
        Ok(self
            .entries
            .lock()
            .expect("ledger mutex poisoned")
            .iter()
            .filter(|entry| entry.assessment == *id)
            .cloned()
            .collect())
    }
}

pub(super) struct FailingLedger;

impl ApprovalLedger for FailingLedger {
    fn append(&self, _entry: ApprovalHistory) -> Result<(), LedgerError> {
        Err(LedgerError::Unavailable("ledger offline".to_string()))
    }

    fn for_assessment(&self, _id: &AssessmentId) -> Result<Vec<ApprovalHistory>, LedgerError> {
        Ok(Vec::new())
    }
}

pub(super) type MemoryService =
    AssessmentWorkflowService<MemoryAssessmentRepository, MemoryLedger>;

pub(super) fn build_service() -> (
    Arc<MemoryService>,
    Arc<MemoryAssessmentRepository>,
    Arc<MemoryLedger>,
) {
    let repository = Arc::new(MemoryAssessmentRepository::default());
    let ledger = Arc::new(MemoryLedger::default());
    let service = Arc::new(AssessmentWorkflowService::new(
        repository.clone(),
        ledger.clone(),
        directory(),
        WorkflowRules::default(),
    ));
    (service, repository, ledger)
}

pub(super) fn assert_status(response: &Response, expected: StatusCode) {
    assert_eq!(response.status(), expected);
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
