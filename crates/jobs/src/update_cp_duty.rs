//! Synchronise the crew portal's duty-change projection.
//!
//! Each run, in order:
//! 1. copies portal acknowledgements back onto the duty change employees,
//! 2. projects visible `(duty change, employee)` pairs that the portal lacks,
//! 3. refreshes portal records whose source duty change was edited,
//! 4. deletes portal records whose source is no longer visible.
//!
//! Every step is computed from the current store contents, so a rerun after a
//! partial failure picks up where the previous run stopped and a rerun on
//! unchanged data writes nothing.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crewjobs_core::{DomainError, RecordId};
use crewjobs_crew::{
    CPDutyChange, CompanyParameter, DutyChangeAggregate, PairingDutyChange, PairingDutyChangeEmployee,
};
use crewjobs_engine::{
    ContextSlot, DataAccess, Job, JobContext, JobError, JobParameterSet, JobResult, JobType,
    ParameterError, ParameterSpec, Record,
};

pub const SHOW_DUTY_HOURS_BEFORE: &str = "ShowDutyHoursBefore";
pub const SHOW_DUTY_HOURS_AFTER: &str = "ShowDutyHoursAfter";

pub const DEFAULT_SHOW_DUTY_HOURS_BEFORE: i64 = 48;
pub const DEFAULT_SHOW_DUTY_HOURS_AFTER: i64 = 24;

static PARAMETERS: [ParameterSpec; 2] = [
    ParameterSpec::optional(
        SHOW_DUTY_HOURS_BEFORE,
        "hours before pairing start that a duty change becomes visible",
    ),
    ParameterSpec::optional(
        SHOW_DUTY_HOURS_AFTER,
        "hours a duty change stays visible after the employee acknowledged it",
    ),
];

/// How long duty changes stay on the portal.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DutyWindow {
    pub show_before: Duration,
    pub show_after: Duration,
}

impl DutyWindow {
    /// Window from `parameters`, built-in defaults for absent names.
    pub fn from_parameters(parameters: &JobParameterSet) -> Result<Self, ParameterError> {
        Ok(Self {
            show_before: parameters.hours_or(SHOW_DUTY_HOURS_BEFORE, DEFAULT_SHOW_DUTY_HOURS_BEFORE)?,
            show_after: parameters.hours_or(SHOW_DUTY_HOURS_AFTER, DEFAULT_SHOW_DUTY_HOURS_AFTER)?,
        })
    }

    /// Job parameters first, then company parameters, then defaults.
    pub fn resolve(job: &JobParameterSet, company: &JobParameterSet) -> Result<Self, ParameterError> {
        Self::from_parameters(&job.or_fallback(company))
    }

    /// Live and inside the lead time before the pairing starts.
    pub fn shows_change(&self, change: &PairingDutyChange, now: DateTime<Utc>) -> bool {
        change.is_live(now) && now >= change.visible_from(self.show_before)
    }

    /// Unacknowledged, or acknowledged less than `show_after` ago.
    pub fn shows_employee(&self, employee: &PairingDutyChangeEmployee, now: DateTime<Utc>) -> bool {
        !employee.acknowledged_before(now - self.show_after)
    }
}

impl Default for DutyWindow {
    fn default() -> Self {
        Self {
            show_before: Duration::hours(DEFAULT_SHOW_DUTY_HOURS_BEFORE),
            show_after: Duration::hours(DEFAULT_SHOW_DUTY_HOURS_AFTER),
        }
    }
}

/// Counts reported in the job output.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
struct SyncSummary {
    acknowledged: usize,
    projected: usize,
    refreshed: usize,
    removed: usize,
}

impl core::fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "copied {} acknowledgement(s), projected {} duty change(s), refreshed {} duty change(s), removed {} stale duty change(s)",
            self.acknowledged, self.projected, self.refreshed, self.removed
        )
    }
}

pub struct UpdateCpDutyJob<D> {
    context: ContextSlot<D>,
}

impl<D: DataAccess> UpdateCpDutyJob<D> {
    pub const JOB_TYPE: JobType = JobType::new("update_cp_duty");

    pub fn new() -> Self {
        Self {
            context: ContextSlot::empty(),
        }
    }

    fn synchronise(&self) -> Result<JobResult, JobError> {
        let ctx = self.context.get();
        let now = ctx.now();

        // Reject malformed job parameters before any read.
        DutyWindow::from_parameters(&ctx.parameters)?;
        let company = ctx.data_access.get_all::<CompanyParameter>()?;
        let window = DutyWindow::resolve(&ctx.parameters, &CompanyParameter::to_parameter_set(&company)?)?;
        debug!(
            show_before_hours = window.show_before.num_hours(),
            show_after_hours = window.show_after.num_hours(),
            "duty window resolved"
        );

        let changes = ctx.data_access.get_all::<PairingDutyChange>()?;
        let mut employees = ctx.data_access.get_all::<PairingDutyChangeEmployee>()?;
        let portal = ctx.data_access.get_all::<CPDutyChange>()?;

        let mut summary = SyncSummary {
            acknowledged: Self::copy_back_acknowledgements(ctx, &portal, &mut employees)?,
            ..SyncSummary::default()
        };

        let aggregates = Self::assemble(changes, employees)?;
        let visible = Self::visible_pairs(&aggregates, &window, now);

        summary.projected = Self::project(ctx, &aggregates, &visible, &portal)?;
        summary.refreshed = Self::refresh(ctx, &aggregates, &visible, &portal)?;
        summary.removed = Self::clean_up(ctx, &visible, portal)?;

        let output = summary.to_string();
        ctx.logger.info(&output);
        Ok(JobResult::success(output))
    }

    /// Copy portal acknowledgements onto the matching duty change employees.
    fn copy_back_acknowledgements(
        ctx: &JobContext<D>,
        portal: &[CPDutyChange],
        employees: &mut [PairingDutyChangeEmployee],
    ) -> Result<usize, JobError> {
        let mut updated = Vec::new();
        for record in portal {
            let Some(ack) = &record.acknowledgement else {
                continue;
            };
            let local = employees.iter_mut().find(|e| {
                e.pairing_duty_change_id == record.original_id && e.employee_id == record.employee_id
            });
            match local {
                Some(local) => {
                    if local.acknowledge(ack.clone()) {
                        updated.push(local.clone());
                    }
                }
                None => ctx.logger.warn(&format!(
                    "acknowledgement for duty change {} by employee {} has no local record",
                    record.original_id, record.employee_id
                )),
            }
        }

        if updated.is_empty() {
            return Ok(0);
        }
        let count = updated.len();
        ctx.data_access.save(updated, false)?;
        Ok(count)
    }

    /// Group employees under their duty change, validating each aggregate.
    fn assemble(
        changes: Vec<PairingDutyChange>,
        employees: Vec<PairingDutyChangeEmployee>,
    ) -> Result<Vec<DutyChangeAggregate>, DomainError> {
        let mut by_change: BTreeMap<RecordId, Vec<PairingDutyChangeEmployee>> = BTreeMap::new();
        for employee in employees {
            by_change
                .entry(employee.pairing_duty_change_id)
                .or_default()
                .push(employee);
        }

        let mut aggregates = Vec::with_capacity(changes.len());
        for change in changes {
            let children = change
                .id
                .and_then(|id| by_change.remove(&id))
                .unwrap_or_default();
            aggregates.push(DutyChangeAggregate::new(change, children)?);
        }

        match by_change.into_keys().next() {
            Some(orphaned) => Err(DomainError::unresolved(PairingDutyChange::KIND, orphaned)),
            None => Ok(aggregates),
        }
    }

    /// `(duty change, employee)` pairs the portal should show right now.
    fn visible_pairs(
        aggregates: &[DutyChangeAggregate],
        window: &DutyWindow,
        now: DateTime<Utc>,
    ) -> BTreeSet<(RecordId, RecordId)> {
        // A later change to the same pairing supersedes earlier ones.
        let mut latest: HashMap<RecordId, RecordId> = HashMap::new();
        for aggregate in aggregates {
            if let Some(pairing_id) = aggregate.change().pairing.id {
                let entry = latest.entry(pairing_id).or_insert(aggregate.id());
                *entry = (*entry).max(aggregate.id());
            }
        }
        let is_current = |aggregate: &DutyChangeAggregate| {
            aggregate
                .change()
                .pairing
                .id
                .is_none_or(|pairing_id| latest.get(&pairing_id) == Some(&aggregate.id()))
        };

        aggregates
            .iter()
            .filter(|&aggregate| is_current(aggregate) && window.shows_change(aggregate.change(), now))
            .flat_map(|aggregate| {
                aggregate
                    .employees()
                    .iter()
                    .filter(move |employee| window.shows_employee(employee, now))
                    .map(move |employee| (aggregate.id(), employee.employee_id))
            })
            .collect()
    }

    fn project(
        ctx: &JobContext<D>,
        aggregates: &[DutyChangeAggregate],
        visible: &BTreeSet<(RecordId, RecordId)>,
        portal: &[CPDutyChange],
    ) -> Result<usize, JobError> {
        let present: BTreeSet<(RecordId, RecordId)> = portal.iter().map(CPDutyChange::key).collect();

        let projected: Vec<CPDutyChange> = aggregates
            .iter()
            .flat_map(|aggregate| {
                aggregate
                    .employees()
                    .iter()
                    .map(move |employee| (aggregate, employee.employee_id))
            })
            .filter(|(aggregate, employee_id)| {
                let key = (aggregate.id(), *employee_id);
                visible.contains(&key) && !present.contains(&key)
            })
            .map(|(aggregate, employee_id)| CPDutyChange::project(aggregate, employee_id))
            .collect();

        if projected.is_empty() {
            return Ok(0);
        }
        let count = projected.len();
        ctx.data_access.save(projected, true)?;
        Ok(count)
    }

    /// Bring visible portal rows in line with an edited source duty change.
    fn refresh(
        ctx: &JobContext<D>,
        aggregates: &[DutyChangeAggregate],
        visible: &BTreeSet<(RecordId, RecordId)>,
        portal: &[CPDutyChange],
    ) -> Result<usize, JobError> {
        let by_id: HashMap<RecordId, &DutyChangeAggregate> =
            aggregates.iter().map(|aggregate| (aggregate.id(), aggregate)).collect();

        let mut refreshed = Vec::new();
        for record in portal.iter().filter(|record| visible.contains(&record.key())) {
            let Some(aggregate) = by_id.get(&record.original_id) else {
                continue;
            };
            let mut record = record.clone();
            if record.refresh_from(&CPDutyChange::project(aggregate, record.employee_id)) {
                refreshed.push(record);
            }
        }

        if refreshed.is_empty() {
            return Ok(0);
        }
        let count = refreshed.len();
        ctx.data_access.save(refreshed, false)?;
        Ok(count)
    }

    fn clean_up(
        ctx: &JobContext<D>,
        visible: &BTreeSet<(RecordId, RecordId)>,
        portal: Vec<CPDutyChange>,
    ) -> Result<usize, JobError> {
        let stale: Vec<CPDutyChange> = portal
            .into_iter()
            .filter(|record| !visible.contains(&record.key()))
            .collect();

        if stale.is_empty() {
            return Ok(0);
        }
        ctx.data_access.delete(&stale)?;
        Ok(stale.len())
    }
}

impl<D: DataAccess> Default for UpdateCpDutyJob<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: DataAccess> Job<D> for UpdateCpDutyJob<D> {
    fn job_type(&self) -> JobType {
        Self::JOB_TYPE
    }

    fn parameters(&self) -> &'static [ParameterSpec] {
        &PARAMETERS
    }

    fn initialise(&mut self, context: JobContext<D>) {
        self.context.fill(context);
    }

    fn execute(&mut self) -> Result<JobResult, JobError> {
        self.synchronise()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::TimeZone;
    use crewjobs_crew::{Acknowledgement, Pairing, Port};
    use crewjobs_engine::{FixedClock, Operation};
    use crewjobs_infra::{InMemoryDataAccess, RecordingDataAccess};

    type Store = RecordingDataAccess<InMemoryDataAccess>;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2011, 1, 1, 0, 0, 0).unwrap()
    }

    fn pairing(id: i64) -> Pairing {
        Pairing::new("XYZ", start(), start() + Duration::hours(10), Port::new("SYD"), Port::new("BNE"))
            .with_id(RecordId::new(id))
    }

    fn change(id: i64, pairing_id: i64) -> PairingDutyChange {
        PairingDutyChange {
            id: Some(RecordId::new(id)),
            ..PairingDutyChange::new(pairing(pairing_id), "Duty changed.")
        }
    }

    fn crew(id: i64, change_id: i64, employee_id: i64) -> PairingDutyChangeEmployee {
        PairingDutyChangeEmployee::new(RecordId::new(change_id), RecordId::new(employee_id))
            .with_id(RecordId::new(id))
    }

    fn run(store: &Arc<Store>, now: DateTime<Utc>, parameters: JobParameterSet) -> Result<JobResult, JobError> {
        let mut job = UpdateCpDutyJob::new();
        job.initialise(
            JobContext::new(store.clone())
                .with_clock(Arc::new(FixedClock(now)))
                .with_parameters(parameters),
        );
        job.execute()
    }

    fn store() -> Arc<Store> {
        Arc::new(RecordingDataAccess::new(Arc::new(InMemoryDataAccess::new())))
    }

    #[test]
    fn window_resolution_prefers_job_then_company_then_default() {
        let job = JobParameterSet::from_pairs([(SHOW_DUTY_HOURS_BEFORE, "3")]).unwrap();
        let company = JobParameterSet::from_pairs([(SHOW_DUTY_HOURS_BEFORE, "5"), (SHOW_DUTY_HOURS_AFTER, "7")]).unwrap();

        let window = DutyWindow::resolve(&job, &company).unwrap();

        assert_eq!(window.show_before, Duration::hours(3));
        assert_eq!(window.show_after, Duration::hours(7));
        assert_eq!(
            DutyWindow::resolve(&JobParameterSet::new(), &JobParameterSet::new()).unwrap(),
            DutyWindow::default()
        );
    }

    #[test]
    fn malformed_parameter_fails_before_touching_the_store() {
        let store = store();
        let parameters = JobParameterSet::from_pairs([(SHOW_DUTY_HOURS_BEFORE, "soon")]).unwrap();

        let err = run(&store, start(), parameters).unwrap_err();

        assert!(matches!(err, JobError::ParameterBinding(ParameterError::Malformed { .. })));
        assert!(store.calls().is_empty());
    }

    #[test]
    fn negative_hours_are_out_of_range() {
        let parameters = JobParameterSet::from_pairs([(SHOW_DUTY_HOURS_AFTER, "-1")]).unwrap();
        let err = run(&store(), start(), parameters).unwrap_err();
        assert!(matches!(err, JobError::ParameterBinding(ParameterError::OutOfRange { .. })));
    }

    #[test]
    fn company_parameter_widens_the_window() {
        let store = store();
        store.inner().seed(vec![change(5, 7)]).unwrap();
        store.inner().seed(vec![crew(1, 5, 1)]).unwrap();
        let three_days_before = start() - Duration::hours(72);

        run(&store, three_days_before, JobParameterSet::new()).unwrap();
        assert_eq!(store.inner().count::<CPDutyChange>(), 0);

        store
            .inner()
            .save(vec![CompanyParameter::new(SHOW_DUTY_HOURS_BEFORE, "96")], true)
            .unwrap();
        run(&store, three_days_before, JobParameterSet::new()).unwrap();
        assert_eq!(store.inner().count::<CPDutyChange>(), 1);
    }

    #[test]
    fn later_change_supersedes_earlier_one_for_the_same_pairing() {
        let store = store();
        store.inner().seed(vec![change(5, 7), change(6, 7)]).unwrap();
        store.inner().seed(vec![crew(1, 5, 1), crew(2, 6, 1)]).unwrap();

        run(&store, start(), JobParameterSet::new()).unwrap();

        let portal = store.inner().get_all::<CPDutyChange>().unwrap();
        assert_eq!(portal.len(), 1);
        assert_eq!(portal[0].original_id, RecordId::new(6));
    }

    #[test]
    fn withdrawn_change_is_removed_from_the_portal() {
        let store = store();
        store.inner().seed(vec![change(5, 7)]).unwrap();
        store.inner().seed(vec![crew(1, 5, 1)]).unwrap();
        run(&store, start(), JobParameterSet::new()).unwrap();
        assert_eq!(store.inner().count::<CPDutyChange>(), 1);

        let mut withdrawn = change(5, 7);
        withdrawn.withdrawn = true;
        store.inner().save(vec![withdrawn], false).unwrap();
        store.reset();
        run(&store, start(), JobParameterSet::new()).unwrap();

        assert_eq!(store.count::<CPDutyChange>(Operation::Delete), 1);
        assert_eq!(store.inner().count::<CPDutyChange>(), 0);
    }

    #[test]
    fn edited_pairing_is_refreshed_on_the_portal() {
        let store = store();
        store.inner().seed(vec![change(5, 7)]).unwrap();
        store.inner().seed(vec![crew(1, 5, 1)]).unwrap();
        run(&store, start(), JobParameterSet::new()).unwrap();
        let projected_id = store.inner().get_all::<CPDutyChange>().unwrap()[0].id;

        let mut edited = change(5, 7);
        edited.pairing.end = start() + Duration::hours(14);
        edited.pairing.port = Port::new("MEL");
        store.inner().save(vec![edited], false).unwrap();
        store.reset();
        let result = run(&store, start(), JobParameterSet::new()).unwrap();

        let portal = store.inner().get_all::<CPDutyChange>().unwrap();
        assert_eq!(portal.len(), 1);
        assert_eq!(portal[0].id, projected_id);
        assert_eq!(portal[0].duty_sign_off, "1-Jan 14:00");
        assert_eq!(portal[0].duty_from_to, "MELBNE");
        assert_eq!(store.saved::<CPDutyChange>().len(), 1);
        assert!(!store.saved::<CPDutyChange>()[0].1);
        assert!(result.output().contains("refreshed 1 duty change(s)"));

        store.reset();
        run(&store, start(), JobParameterSet::new()).unwrap();
        assert_eq!(store.count::<CPDutyChange>(Operation::Save), 0);
    }

    #[test]
    fn hidden_change_is_not_projected_yet() {
        let store = store();
        let mut hidden = change(5, 7);
        hidden.hide_until = Some(start() + Duration::hours(1));
        store.inner().seed(vec![hidden]).unwrap();
        store.inner().seed(vec![crew(1, 5, 1)]).unwrap();

        run(&store, start(), JobParameterSet::new()).unwrap();
        assert_eq!(store.inner().count::<CPDutyChange>(), 0);

        run(&store, start() + Duration::hours(1), JobParameterSet::new()).unwrap();
        assert_eq!(store.inner().count::<CPDutyChange>(), 1);
    }

    #[test]
    fn recent_acknowledgement_keeps_the_record_visible() {
        let store = store();
        store.inner().seed(vec![change(5, 7)]).unwrap();
        let mut acked = crew(1, 5, 1);
        acked.acknowledgement = Some(Acknowledgement {
            acknowledged_by: RecordId::new(1),
            acknowledged_type: 2,
            acknowledged_date: start(),
        });
        store.inner().seed(vec![acked]).unwrap();

        run(&store, start() + Duration::hours(23), JobParameterSet::new()).unwrap();
        assert_eq!(store.inner().count::<CPDutyChange>(), 1);

        run(&store, start() + Duration::hours(24), JobParameterSet::new()).unwrap();
        assert_eq!(store.inner().count::<CPDutyChange>(), 0);
    }

    #[test]
    fn orphaned_duty_change_employee_fails_the_run() {
        let store = store();
        store.inner().seed(vec![crew(1, 99, 1)]).unwrap();

        let err = run(&store, start(), JobParameterSet::new()).unwrap_err();

        assert_eq!(
            err.to_string(),
            "domain invariant violated: pairing_duty_change 99 not found"
        );
    }

    #[test]
    fn acknowledgement_without_local_record_is_skipped() {
        let store = store();
        store
            .inner()
            .save(
                vec![CPDutyChange {
                    id: None,
                    original_id: RecordId::new(40),
                    employee_id: RecordId::new(3),
                    duty: "XYZ".to_string(),
                    duty_sign_on: String::new(),
                    duty_sign_off: String::new(),
                    duty_from_to: String::new(),
                    public_comment: String::new(),
                    sign_on_at: start(),
                    acknowledgement: Some(Acknowledgement {
                        acknowledged_by: RecordId::new(3),
                        acknowledged_type: 1,
                        acknowledged_date: start(),
                    }),
                }],
                true,
            )
            .unwrap();

        let result = run(&store, start(), JobParameterSet::new()).unwrap();

        assert_eq!(store.count::<PairingDutyChangeEmployee>(Operation::Save), 0);
        assert_eq!(store.count::<CPDutyChange>(Operation::Delete), 1);
        assert_eq!(
            result.output(),
            "copied 0 acknowledgement(s), projected 0 duty change(s), refreshed 0 duty change(s), removed 1 stale duty change(s)"
        );
    }

    #[test]
    fn declares_window_parameters() {
        let job = UpdateCpDutyJob::<Store>::new();
        let names: Vec<&str> = job.parameters().iter().map(|p| p.name).collect();
        assert_eq!(names, vec![SHOW_DUTY_HOURS_BEFORE, SHOW_DUTY_HOURS_AFTER]);
        assert!(job.parameters().iter().all(|p| !p.required));
    }
}
