use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use assess_core::assessment::{
    ApprovalHistory, ApprovalLedger, Assessment, AssessmentId, AssessmentRepository,
    AssessmentStatus, AssessmentWorkflowService, LedgerError, RepositoryError,
};
use assess_core::budget::{BudgetRecord, BudgetRepository, BudgetRepositoryError, BudgetService};
use assess_core::evidence::{
    BackendError, EvidenceFile, EvidenceOwner, EvidenceRepository, EvidenceStore,
    EvidenceSyncService, SessionError, SessionGate,
};
use assess_core::hierarchy::fiscal::{FiscalYear, YearFilter};
use assess_core::hierarchy::{
    HealthRegion, HierarchyDirectory, OrganizationalUnit, Province, ProvinceId, RegionId, UnitId,
    UnitKind,
};
use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// The concrete workflow service wired by the server and the demo.
pub(crate) type WorkflowService =
    AssessmentWorkflowService<InMemoryAssessmentRepository, InMemoryApprovalLedger>;

pub(crate) type InMemoryEvidenceService =
    EvidenceSyncService<InMemoryBlobStore, InMemoryEvidenceRepository, AlwaysFreshSession>;

#[derive(Default)]
pub(crate) struct InMemoryAssessmentRepository {
    records: Mutex<HashMap<AssessmentId, Assessment>>,
    sequence: AtomicU64,
}

impl AssessmentRepository for InMemoryAssessmentRepository {
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

#[derive(Default)]
pub(crate) struct InMemoryApprovalLedger {
    entries: Mutex<Vec<ApprovalHistory>>,
}

impl ApprovalLedger for InMemoryApprovalLedger {
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

#[derive(Default)]
pub(crate) struct InMemoryBudgetRepository {
    rows: Mutex<HashMap<(UnitId, FiscalYear), Vec<BudgetRecord>>>,
}

impl BudgetRepository for InMemoryBudgetRepository {
    fn replace_for_unit_year(
        &self,
        unit: &UnitId,
        year: FiscalYear,
        records: Vec<BudgetRecord>,
    ) -> Result<(), BudgetRepositoryError> {
        let mut guard = self.rows.lock().expect("budget mutex poisoned");
        guard.insert((unit.clone(), year), records);
        Ok(())
    }

    fn for_year(&self, filter: YearFilter) -> Result<Vec<BudgetRecord>, BudgetRepositoryError> {
        let guard = self.rows.lock().expect("budget mutex poisoned");
        Ok(guard
            .iter()
            .filter(|((_, year), _)| filter.matches(*year))
            .flat_map(|(_, records)| records.iter().cloned())
            .collect())
    }
}

#[derive(Default)]
pub(crate) struct InMemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl EvidenceStore for InMemoryBlobStore {
    async fn put(
        &self,
        path: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), BackendError> {
        self.blobs
            .lock()
            .expect("blob mutex poisoned")
            .insert(path.to_string(), bytes);
        Ok(())
    }

    async fn fetch(&self, path: &str) -> Result<Vec<u8>, BackendError> {
        self.blobs
            .lock()
            .expect("blob mutex poisoned")
            .get(path)
            .cloned()
            .ok_or(BackendError::NotFound)
    }

    async fn remove(&self, path: &str) -> Result<(), BackendError> {
        self.blobs
            .lock()
            .expect("blob mutex poisoned")
            .remove(path)
            .map(|_| ())
            .ok_or(BackendError::NotFound)
    }
}

#[derive(Default)]
pub(crate) struct InMemoryEvidenceRepository {
    rows: Mutex<Vec<EvidenceFile>>,
}

impl EvidenceRepository for InMemoryEvidenceRepository {
    async fn insert(&self, file: EvidenceFile) -> Result<(), BackendError> {
        self.rows
            .lock()
            .expect("evidence mutex poisoned")
            .push(file);
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), BackendError> {
        self.rows
            .lock()
            .expect("evidence mutex poisoned")
            .retain(|row| row.path != path);
        Ok(())
    }

    async fn list_for_owner(
        &self,
        owner: &EvidenceOwner,
    ) -> Result<Vec<EvidenceFile>, BackendError> {
        Ok(self
            .rows
            .lock()
            .expect("evidence mutex poisoned")
            .iter()
            .filter(|row| row.owner == *owner)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub(crate) struct AlwaysFreshSession;

impl SessionGate for AlwaysFreshSession {
    async fn ensure_fresh(&self) -> Result<(), SessionError> {
        Ok(())
    }
}

pub(crate) fn budget_service(
    repository: Arc<InMemoryBudgetRepository>,
) -> BudgetService<InMemoryBudgetRepository> {
    BudgetService::new(repository)
}

/// Hierarchy used by the server until the directory sync against the hosted
/// backend is wired in, and by the report/demo subcommands.
pub(crate) fn seeded_directory() -> Arc<HierarchyDirectory> {
    let regions = vec![
        HealthRegion {
            id: RegionId("r01".into()),
            name: "Health Region 1".into(),
        },
        HealthRegion {
            id: RegionId("r02".into()),
            name: "Health Region 2".into(),
        },
    ];
    let provinces = vec![
        Province {
            id: ProvinceId("p-river".into()),
            name: "River Province".into(),
            region: RegionId("r01".into()),
        },
        Province {
            id: ProvinceId("p-highland".into()),
            name: "Highland Province".into(),
            region: RegionId("r01".into()),
        },
        Province {
            id: ProvinceId("p-coastal".into()),
            name: "Coastal Province".into(),
            region: RegionId("r02".into()),
        },
    ];
    let units = vec![
        OrganizationalUnit {
            id: UnitId("h-river-general".into()),
            name: "River General Hospital".into(),
            kind: UnitKind::Hospital,
            province: ProvinceId("p-river".into()),
        },
        OrganizationalUnit {
            id: UnitId("h-river-district".into()),
            name: "River District Hospital".into(),
            kind: UnitKind::Hospital,
            province: ProvinceId("p-river".into()),
        },
        OrganizationalUnit {
            id: UnitId("o-river-office".into()),
            name: "River Health Office".into(),
            kind: UnitKind::HealthOffice,
            province: ProvinceId("p-river".into()),
        },
        OrganizationalUnit {
            id: UnitId("h-highland-central".into()),
            name: "Highland Central Hospital".into(),
            kind: UnitKind::Hospital,
            province: ProvinceId("p-highland".into()),
        },
        OrganizationalUnit {
            id: UnitId("h-coastal-general".into()),
            name: "Coastal General Hospital".into(),
            kind: UnitKind::Hospital,
            province: ProvinceId("p-coastal".into()),
        },
    ];

    Arc::new(
        HierarchyDirectory::build(regions, provinces, units)
            .expect("seeded hierarchy is internally consistent"),
    )
}

/// Parse a displayed era year ("2569") into the stored fiscal year.
pub(crate) fn parse_display_year(raw: &str) -> Result<FiscalYear, String> {
    raw.trim()
        .parse::<i32>()
        .map(FiscalYear::from_display)
        .map_err(|err| format!("failed to parse '{raw}' as a display year ({err})"))
}
