//! Pairings and the duty changes published against them.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crewjobs_core::{DomainError, DomainResult, RecordId};

/// Display format for duty sign-on/sign-off times, e.g. `1-Jan 00:00`.
pub const DUTY_TIME_FORMAT: &str = "%-d-%b %H:%M";

/// Airport, identified by its IATA code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Port {
    pub iata_code: String,
}

impl Port {
    pub fn new(iata_code: impl Into<String>) -> Self {
        Self {
            iata_code: iata_code.into(),
        }
    }
}

/// A scheduled trip between two ports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pairing {
    pub id: Option<RecordId>,
    pub label: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub port: Port,
    pub to_port: Port,
}

impl Pairing {
    pub fn new(
        label: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        port: Port,
        to_port: Port,
    ) -> Self {
        Self {
            id: None,
            label: label.into(),
            start,
            end,
            port,
            to_port,
        }
    }

    pub fn with_id(mut self, id: RecordId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn sign_on_text(&self) -> String {
        self.start.format(DUTY_TIME_FORMAT).to_string()
    }

    pub fn sign_off_text(&self) -> String {
        self.end.format(DUTY_TIME_FORMAT).to_string()
    }

    /// Origin code immediately followed by destination code (`SYDBNE`).
    pub fn from_to(&self) -> String {
        format!("{}{}", self.port.iata_code, self.to_port.iata_code)
    }
}

/// Acknowledgement of a duty change by (or on behalf of) an employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledgement {
    pub acknowledged_by: RecordId,
    pub acknowledged_type: i32,
    pub acknowledged_date: DateTime<Utc>,
}

/// A change to a pairing that crew must be told about.
///
/// Stored without its employees; see [`DutyChangeAggregate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingDutyChange {
    pub id: Option<RecordId>,
    pub pairing: Pairing,
    pub alarm_at: Option<DateTime<Utc>>,
    pub notify: bool,
    /// Not shown to crew before this instant.
    pub hide_until: Option<DateTime<Utc>>,
    pub public_comment: String,
    pub withdrawn: bool,
}

impl PairingDutyChange {
    pub fn new(pairing: Pairing, public_comment: impl Into<String>) -> Self {
        Self {
            id: None,
            pairing,
            alarm_at: None,
            notify: true,
            hide_until: None,
            public_comment: public_comment.into(),
            withdrawn: false,
        }
    }

    pub fn is_published(&self, now: DateTime<Utc>) -> bool {
        self.hide_until.is_none_or(|until| until <= now)
    }

    /// Notifiable, not withdrawn and past its hide-until time.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        !self.withdrawn && self.notify && self.is_published(now)
    }

    /// First instant the change may appear on the portal.
    pub fn visible_from(&self, show_before: Duration) -> DateTime<Utc> {
        self.pairing.start - show_before
    }
}

impl_record!(PairingDutyChange, "pairing_duty_change");

/// Per-employee record of a duty change, carrying the acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingDutyChangeEmployee {
    pub id: Option<RecordId>,
    pub pairing_duty_change_id: RecordId,
    pub employee_id: RecordId,
    pub acknowledgement: Option<Acknowledgement>,
}

impl PairingDutyChangeEmployee {
    pub fn new(pairing_duty_change_id: RecordId, employee_id: RecordId) -> Self {
        Self {
            id: None,
            pairing_duty_change_id,
            employee_id,
            acknowledgement: None,
        }
    }

    pub fn with_id(mut self, id: RecordId) -> Self {
        self.id = Some(id);
        self
    }

    /// Record `acknowledgement`; returns false when it was already the recorded one.
    pub fn acknowledge(&mut self, acknowledgement: Acknowledgement) -> bool {
        if self.acknowledgement.as_ref() == Some(&acknowledgement) {
            return false;
        }
        self.acknowledgement = Some(acknowledgement);
        true
    }

    /// Acknowledged at or before `cutoff`.
    pub fn acknowledged_before(&self, cutoff: DateTime<Utc>) -> bool {
        self.acknowledgement
            .as_ref()
            .is_some_and(|ack| ack.acknowledged_date <= cutoff)
    }
}

impl_record!(PairingDutyChangeEmployee, "pairing_duty_change_employee", |e| Some(
    format!("{}:{}", e.pairing_duty_change_id, e.employee_id)
));

/// A duty change with the employees it applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DutyChangeAggregate {
    id: RecordId,
    change: PairingDutyChange,
    employees: Vec<PairingDutyChangeEmployee>,
}

impl DutyChangeAggregate {
    /// Every child must reference the change and name a distinct employee.
    pub fn new(change: PairingDutyChange, employees: Vec<PairingDutyChangeEmployee>) -> DomainResult<Self> {
        let id = change
            .id
            .ok_or_else(|| DomainError::validation("duty change has no identity"))?;

        let mut seen = Vec::with_capacity(employees.len());
        for employee in &employees {
            if employee.pairing_duty_change_id != id {
                return Err(DomainError::invariant(format!(
                    "duty change employee {} belongs to duty change {}, not {id}",
                    employee.employee_id, employee.pairing_duty_change_id
                )));
            }
            if seen.contains(&employee.employee_id) {
                return Err(DomainError::Duplicate {
                    kind: "pairing_duty_change_employee",
                    parent: "pairing_duty_change",
                    parent_id: id.get(),
                    child_id: employee.employee_id.get(),
                });
            }
            seen.push(employee.employee_id);
        }

        Ok(Self { id, change, employees })
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn change(&self) -> &PairingDutyChange {
        &self.change
    }

    pub fn employees(&self) -> &[PairingDutyChangeEmployee] {
        &self.employees
    }

    pub fn employee(&self, employee_id: RecordId) -> Option<&PairingDutyChangeEmployee> {
        self.employees.iter().find(|e| e.employee_id == employee_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn pairing() -> Pairing {
        let start = Utc.with_ymd_and_hms(2011, 1, 1, 0, 0, 0).unwrap();
        Pairing::new("XYZ", start, start + Duration::hours(10), Port::new("SYD"), Port::new("BNE"))
            .with_id(RecordId::new(7))
    }

    fn change() -> PairingDutyChange {
        PairingDutyChange {
            id: Some(RecordId::new(5)),
            ..PairingDutyChange::new(pairing(), "Duty changed.")
        }
    }

    #[test]
    fn duty_texts() {
        let pairing = pairing();
        assert_eq!(pairing.sign_on_text(), "1-Jan 00:00");
        assert_eq!(pairing.sign_off_text(), "1-Jan 10:00");
        assert_eq!(pairing.from_to(), "SYDBNE");
    }

    #[test]
    fn two_digit_days_and_afternoon_hours() {
        let mut pairing = pairing();
        pairing.start = Utc.with_ymd_and_hms(2011, 11, 23, 17, 5, 0).unwrap();
        assert_eq!(pairing.sign_on_text(), "23-Nov 17:05");
    }

    #[test]
    fn liveness() {
        let now = Utc.with_ymd_and_hms(2011, 1, 1, 0, 0, 0).unwrap();
        let mut dc = change();
        assert!(dc.is_live(now));

        dc.hide_until = Some(now + Duration::minutes(1));
        assert!(!dc.is_live(now));
        dc.hide_until = Some(now);
        assert!(dc.is_live(now));

        dc.notify = false;
        assert!(!dc.is_live(now));
        dc.notify = true;
        dc.withdrawn = true;
        assert!(!dc.is_live(now));
    }

    #[test]
    fn acknowledge_reports_changes_only() {
        let ack = Acknowledgement {
            acknowledged_by: RecordId::new(1),
            acknowledged_type: 2,
            acknowledged_date: Utc.with_ymd_and_hms(2011, 1, 1, 0, 0, 0).unwrap(),
        };
        let mut employee = PairingDutyChangeEmployee::new(RecordId::new(5), RecordId::new(2));

        assert!(employee.acknowledge(ack.clone()));
        assert!(!employee.acknowledge(ack.clone()));
        assert!(employee.acknowledged_before(ack.acknowledged_date));
        assert!(!employee.acknowledged_before(ack.acknowledged_date - Duration::seconds(1)));
    }

    #[test]
    fn aggregate_rejects_foreign_children() {
        let foreign = PairingDutyChangeEmployee::new(RecordId::new(6), RecordId::new(1));
        let err = DutyChangeAggregate::new(change(), vec![foreign]).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn aggregate_rejects_duplicate_employees() {
        let employees = vec![
            PairingDutyChangeEmployee::new(RecordId::new(5), RecordId::new(1)),
            PairingDutyChangeEmployee::new(RecordId::new(5), RecordId::new(1)),
        ];
        let err = DutyChangeAggregate::new(change(), employees).unwrap_err();
        assert!(matches!(err, DomainError::Duplicate { parent_id: 5, child_id: 1, .. }));
    }

    #[test]
    fn aggregate_requires_identity() {
        let dc = PairingDutyChange::new(pairing(), "");
        assert!(DutyChangeAggregate::new(dc, Vec::new()).is_err());
    }

    #[test]
    fn aggregate_lookup_by_employee() {
        let employees = vec![
            PairingDutyChangeEmployee::new(RecordId::new(5), RecordId::new(1)),
            PairingDutyChangeEmployee::new(RecordId::new(5), RecordId::new(2)),
        ];
        let aggregate = DutyChangeAggregate::new(change(), employees).unwrap();
        assert_eq!(aggregate.id(), RecordId::new(5));
        assert_eq!(aggregate.employee(RecordId::new(2)).unwrap().employee_id, RecordId::new(2));
        assert!(aggregate.employee(RecordId::new(3)).is_none());
    }

    proptest! {
        #[test]
        fn sign_on_text_matches_calendar_fields(
            month in 1u32..=12,
            day in 1u32..=28,
            hour in 0u32..24,
            minute in 0u32..60,
        ) {
            let mut pairing = pairing();
            pairing.start = Utc.with_ymd_and_hms(2011, month, day, hour, minute, 0).unwrap();

            const MONTHS: [&str; 12] = [
                "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
            ];
            let expected = format!("{day}-{} {hour:02}:{minute:02}", MONTHS[(month - 1) as usize]);
            prop_assert_eq!(pairing.sign_on_text(), expected);
        }

        #[test]
        fn from_to_is_plain_concatenation(origin in "[A-Z]{3}", destination in "[A-Z]{3}") {
            let mut pairing = pairing();
            pairing.port = Port::new(origin.clone());
            pairing.to_port = Port::new(destination.clone());
            prop_assert_eq!(pairing.from_to(), format!("{origin}{destination}"));
        }
    }
}
