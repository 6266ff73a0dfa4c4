use std::path::PathBuf;
use std::sync::Arc;

use assess_core::access::{Profile, Role, Scope};
use assess_core::assessment::{
    AssessmentPeriod, AssessmentWorkflowService, BreachSeverity, ImpactFacts, ItemEdit,
    ItemStatus, SecurityCategory, WorkflowAction, WorkflowRules,
};
use assess_core::budget::import::import_plans;
use assess_core::budget::BudgetService;
use assess_core::error::AppError;
use assess_core::evidence::{
    EvidenceOwner, EvidenceSyncService, RetryPolicy, UploadLimits, UploadRequest,
};
use assess_core::hierarchy::fiscal::{FiscalYear, YearFilter};
use assess_core::hierarchy::{HierarchyDirectory, ProvinceId, RegionId, UnitId};
use assess_core::reporting::{
    level_rows, rollup_budgets, rollup_impact, rollup_scores, AssessmentSnapshot, DrillPath,
    RollupRowView, RollupTable,
};
use chrono::Local;
use clap::Args;

use crate::infra::{
    budget_service, seeded_directory, AlwaysFreshSession, InMemoryApprovalLedger,
    InMemoryAssessmentRepository, InMemoryBlobStore, InMemoryBudgetRepository,
    InMemoryEvidenceRepository, InMemoryEvidenceService, WorkflowService,
};
use crate::routes::ReportMetric;

#[derive(Args, Debug)]
pub(crate) struct CoverageReportArgs {
    /// Fiscal year in display (era) form, e.g. 2569. Defaults to all years.
    #[arg(long, value_parser = crate::infra::parse_display_year)]
    pub(crate) fiscal_year: Option<FiscalYear>,
    /// Figure to fold through the hierarchy
    #[arg(long, value_enum, default_value = "budget")]
    pub(crate) metric: ReportMetric,
    /// Optional budget plan CSV (Unit,Category,Amount) to hydrate figures
    #[arg(long)]
    pub(crate) budget_csv: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Skip the evidence synchronization portion of the demo
    #[arg(long)]
    pub(crate) skip_evidence: bool,
}

struct DemoActors {
    central: Profile,
    river_approver: Profile,
    highland_approver: Profile,
    regional_one: Profile,
}

fn demo_actors() -> DemoActors {
    DemoActors {
        central: Profile::new("demo-central", "Central Admin", Role::CentralAdmin, Scope::National)
            .expect("central profile is valid"),
        river_approver: Profile::new(
            "demo-river",
            "River Approver",
            Role::ProvincialApprover,
            Scope::Province(ProvinceId("p-river".into())),
        )
        .expect("river profile is valid"),
        highland_approver: Profile::new(
            "demo-highland",
            "Highland Approver",
            Role::ProvincialApprover,
            Scope::Province(ProvinceId("p-highland".into())),
        )
        .expect("highland profile is valid"),
        regional_one: Profile::new(
            "demo-regional",
            "Region 1 Approver",
            Role::RegionalApprover,
            Scope::Region(RegionId("r01".into())),
        )
        .expect("regional profile is valid"),
    }
}

fn build_workflow(directory: Arc<HierarchyDirectory>) -> Arc<WorkflowService> {
    Arc::new(AssessmentWorkflowService::new(
        Arc::new(InMemoryAssessmentRepository::default()),
        Arc::new(InMemoryApprovalLedger::default()),
        directory,
        WorkflowRules::default(),
    ))
}

fn uniform_edits(status: ItemStatus) -> Vec<ItemEdit> {
    SecurityCategory::ordered()
        .into_iter()
        .map(|category| ItemEdit {
            category,
            status,
            note: None,
        })
        .collect()
}

/// Walk the demo hierarchy through one reporting cycle so the roll-up views
/// have data at every level.
fn seed_assessments(
    workflow: &WorkflowService,
    year: FiscalYear,
) -> Result<(), AppError> {
    let actors = demo_actors();

    // River General: clean cycle, approved all the way up.
    let river_general = workflow.create(
        UnitId("h-river-general".into()),
        year,
        AssessmentPeriod::FirstRound,
        &actors.central,
    )?;
    workflow.commit_items(&river_general.id, uniform_edits(ItemStatus::Pass), &actors.central)?;
    workflow.commit_impact(&river_general.id, ImpactFacts::clean(), &actors.central)?;
    workflow.transition(&river_general.id, WorkflowAction::Submit, &actors.central)?;
    workflow.transition(
        &river_general.id,
        WorkflowAction::ApproveProvincial,
        &actors.river_approver,
    )?;
    workflow.transition(
        &river_general.id,
        WorkflowAction::ApproveRegional,
        &actors.regional_one,
    )?;

    // River District: incident history, provincial approval only so far.
    let river_district = workflow.create(
        UnitId("h-river-district".into()),
        year,
        AssessmentPeriod::FirstRound,
        &actors.central,
    )?;
    workflow.commit_items(
        &river_district.id,
        uniform_edits(ItemStatus::Partial),
        &actors.central,
    )?;
    workflow.commit_impact(
        &river_district.id,
        ImpactFacts {
            had_incident: true,
            recovery_hours: 30,
            had_breach: true,
            breach_severity: BreachSeverity::Medium,
        },
        &actors.central,
    )?;
    workflow.transition(&river_district.id, WorkflowAction::Submit, &actors.central)?;
    workflow.transition(
        &river_district.id,
        WorkflowAction::ApproveProvincial,
        &actors.river_approver,
    )?;

    // River Health Office: returned for revision; stays out of aggregates.
    let river_office = workflow.create(
        UnitId("o-river-office".into()),
        year,
        AssessmentPeriod::FirstRound,
        &actors.central,
    )?;
    workflow.transition(&river_office.id, WorkflowAction::Submit, &actors.central)?;
    workflow.transition(
        &river_office.id,
        WorkflowAction::ReturnProvincial,
        &actors.river_approver,
    )?;

    // Highland Central: approved at the provincial tier.
    let highland = workflow.create(
        UnitId("h-highland-central".into()),
        year,
        AssessmentPeriod::FirstRound,
        &actors.central,
    )?;
    workflow.commit_items(&highland.id, uniform_edits(ItemStatus::Pass), &actors.central)?;
    workflow.commit_impact(
        &highland.id,
        ImpactFacts {
            had_incident: true,
            recovery_hours: 3,
            had_breach: false,
            breach_severity: BreachSeverity::None,
        },
        &actors.central,
    )?;
    workflow.transition(&highland.id, WorkflowAction::Submit, &actors.central)?;
    workflow.transition(
        &highland.id,
        WorkflowAction::ApproveProvincial,
        &actors.highland_approver,
    )?;

    // Coastal General: still a draft; must not appear in any aggregate.
    workflow.create(
        UnitId("h-coastal-general".into()),
        year,
        AssessmentPeriod::FirstRound,
        &actors.central,
    )?;

    Ok(())
}

fn seed_budgets(
    service: &BudgetService<InMemoryBudgetRepository>,
    directory: &HierarchyDirectory,
    year: FiscalYear,
) -> Result<(), AppError> {
    let scales = [120_000.0, 60_000.0, 35_000.0, 90_000.0, 75_000.0];
    let mut units: Vec<UnitId> = Vec::new();
    for region in directory.region_ids() {
        for province in directory.provinces_in(&region) {
            units.extend(directory.units_in(province).iter().cloned());
        }
    }

    for (index, unit) in units.iter().enumerate() {
        let scale = scales[index % scales.len()];
        let plan = SecurityCategory::ordered()
            .into_iter()
            .map(|category| (category, scale * f64::from(category.weight()) / 100.0))
            .collect();
        service.save_plan(unit, year, plan)?;
    }
    Ok(())
}

fn render_rows(title: &str, rows: &[RollupRowView]) {
    println!("\n{title}");
    for row in rows {
        match row.average {
            Some(average) => println!(
                "  - {:<28} total {:>12.2} | units {} | avg {:.1}",
                row.name, row.total, row.units_assessed, average
            ),
            None => println!(
                "  - {:<28} total {:>12.2} | units {}",
                row.name, row.total, row.units_assessed
            ),
        }
    }
}

fn render_drilldown(
    directory: &HierarchyDirectory,
    table: &RollupTable,
    title: &str,
) {
    let admin = demo_actors().central;
    let path = DrillPath::start_for(&admin, directory);
    render_rows(&format!("{title} by region"), &level_rows(directory, table, &path));

    for region in directory.region_ids() {
        let mut region_path = path.clone();
        if region_path
            .enter_region(&admin, directory, region.clone())
            .is_err()
        {
            continue;
        }
        let name = directory
            .region(&region)
            .map(|row| row.name.clone())
            .unwrap_or_else(|| region.0.clone());
        render_rows(
            &format!("{title}: {name} by province"),
            &level_rows(directory, table, &region_path),
        );
    }
}

pub(crate) fn run_coverage_report(args: CoverageReportArgs) -> Result<(), AppError> {
    let directory = seeded_directory();
    let year = args
        .fiscal_year
        .unwrap_or_else(|| FiscalYear::containing(Local::now().date_naive()));
    let filter = match args.fiscal_year {
        Some(selected) => YearFilter::One(selected),
        None => YearFilter::All,
    };

    let budgets = Arc::new(InMemoryBudgetRepository::default());
    let budget_svc = budget_service(budgets.clone());
    match &args.budget_csv {
        Some(path) => {
            let file = std::fs::File::open(path)?;
            let imported = import_plans(&budget_svc, year, file)?;
            println!("Imported budget plans for {imported} unit(s) from {}", path.display());
        }
        None => seed_budgets(&budget_svc, &directory, year)?,
    }

    let workflow = build_workflow(directory.clone());
    seed_assessments(&workflow, year)?;
    let snapshots: Vec<AssessmentSnapshot> = workflow
        .list(filter)?
        .iter()
        .map(AssessmentSnapshot::from)
        .collect();

    println!(
        "Coverage report for fiscal year {}",
        args.fiscal_year
            .map(|fy| fy.to_string())
            .unwrap_or_else(|| "all".to_string())
    );

    let table = match args.metric {
        ReportMetric::Budget => {
            rollup_budgets(&directory, &budget_svc.for_year(filter)?, filter)
        }
        ReportMetric::Score => rollup_scores(&directory, &snapshots, filter),
        ReportMetric::Impact => rollup_impact(&directory, &snapshots, filter),
    };
    let label = match args.metric {
        ReportMetric::Budget => "Budget",
        ReportMetric::Score => "Assessment score",
        ReportMetric::Impact => "Impact score",
    };
    render_drilldown(&directory, &table, label);

    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let directory = seeded_directory();
    let year = FiscalYear::containing(Local::now().date_naive());

    println!("Assessment platform demo, fiscal year {}", year);

    let workflow = build_workflow(directory.clone());
    seed_assessments(&workflow, year)?;
    println!("Seeded one assessment cycle per unit and walked the approval ladder.");

    for assessment in workflow.list(YearFilter::One(year))? {
        println!(
            "  - {:<18} {:<24} status {:<20} total {}",
            assessment.id.0,
            assessment.unit.0,
            assessment.status.label(),
            assessment
                .total_score
                .map(|total| format!("{total:.1}"))
                .unwrap_or_else(|| "-".to_string()),
        );
    }

    let budgets = Arc::new(InMemoryBudgetRepository::default());
    let budget_svc = budget_service(budgets);
    seed_budgets(&budget_svc, &directory, year)?;

    let filter = YearFilter::One(year);
    let snapshots: Vec<AssessmentSnapshot> = workflow
        .list(filter)?
        .iter()
        .map(AssessmentSnapshot::from)
        .collect();

    render_drilldown(
        &directory,
        &rollup_budgets(&directory, &budget_svc.for_year(filter)?, filter),
        "Budget",
    );
    render_drilldown(
        &directory,
        &rollup_scores(&directory, &snapshots, filter),
        "Assessment score",
    );
    render_drilldown(
        &directory,
        &rollup_impact(&directory, &snapshots, filter),
        "Impact score",
    );

    if !args.skip_evidence {
        run_evidence_demo().await?;
    }

    Ok(())
}

async fn run_evidence_demo() -> Result<(), AppError> {
    println!("\nEvidence synchronization");

    let service: InMemoryEvidenceService = EvidenceSyncService::new(
        Arc::new(InMemoryBlobStore::default()),
        Arc::new(InMemoryEvidenceRepository::default()),
        Arc::new(AlwaysFreshSession),
        UploadLimits::default(),
        RetryPolicy::default(),
    );

    let owner = EvidenceOwner {
        assessment: assess_core::assessment::AssessmentId("asm-000001".into()),
        item: SecurityCategory::NetworkSecurity.key().to_string(),
    };

    for (count, name) in ["firewall rules (export).txt", "IDS alert log#2026.csv"]
        .into_iter()
        .enumerate()
    {
        let content_type = mime_guess::from_path(name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        let stored = service
            .upload(
                UploadRequest {
                    owner: owner.clone(),
                    file_name: name.to_string(),
                    content_type,
                    bytes: format!("demo payload for {name}").into_bytes(),
                },
                count,
            )
            .await?;
        println!("  - uploaded '{}' as {}", name, stored.path);
    }

    let listed = service.list_for_owner(&owner).await?;
    println!("  - {} file(s) on record for {}", listed.len(), owner.item);

    if let Some(first) = listed.first() {
        let bytes = service.download(first).await?;
        println!("  - downloaded {} ({} bytes)", first.file_name, bytes.len());
        service.delete(first).await?;
        println!("  - deleted {} (blob first, then metadata)", first.file_name);
    }

    Ok(())
}
