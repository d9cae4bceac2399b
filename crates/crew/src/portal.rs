//! Crew portal projection of duty changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crewjobs_core::RecordId;

use crate::duty_change::{Acknowledgement, DutyChangeAggregate};

/// Flattened, per-employee view of a duty change as shown on the portal.
///
/// Acknowledgements made on the portal land here first and are copied back
/// to the matching [`PairingDutyChangeEmployee`](crate::PairingDutyChangeEmployee).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CPDutyChange {
    pub id: Option<RecordId>,
    /// The source `PairingDutyChange`.
    pub original_id: RecordId,
    pub employee_id: RecordId,
    pub duty: String,
    pub duty_sign_on: String,
    pub duty_sign_off: String,
    pub duty_from_to: String,
    pub public_comment: String,
    pub sign_on_at: DateTime<Utc>,
    pub acknowledgement: Option<Acknowledgement>,
}

impl CPDutyChange {
    /// Project `aggregate` for one of its employees.
    pub fn project(aggregate: &DutyChangeAggregate, employee_id: RecordId) -> Self {
        let change = aggregate.change();
        let pairing = &change.pairing;
        Self {
            id: None,
            original_id: aggregate.id(),
            employee_id,
            duty: pairing.label.clone(),
            duty_sign_on: pairing.sign_on_text(),
            duty_sign_off: pairing.sign_off_text(),
            duty_from_to: pairing.from_to(),
            public_comment: change.public_comment.clone(),
            sign_on_at: pairing.start,
            acknowledgement: aggregate
                .employee(employee_id)
                .and_then(|e| e.acknowledgement.clone()),
        }
    }

    pub fn key(&self) -> (RecordId, RecordId) {
        (self.original_id, self.employee_id)
    }

    /// Take the displayed duty fields from `projected`, keeping identity and
    /// acknowledgement. Returns false when nothing changed.
    pub fn refresh_from(&mut self, projected: &CPDutyChange) -> bool {
        let unchanged = self.duty == projected.duty
            && self.duty_sign_on == projected.duty_sign_on
            && self.duty_sign_off == projected.duty_sign_off
            && self.duty_from_to == projected.duty_from_to
            && self.public_comment == projected.public_comment
            && self.sign_on_at == projected.sign_on_at;
        if unchanged {
            return false;
        }
        self.duty = projected.duty.clone();
        self.duty_sign_on = projected.duty_sign_on.clone();
        self.duty_sign_off = projected.duty_sign_off.clone();
        self.duty_from_to = projected.duty_from_to.clone();
        self.public_comment = projected.public_comment.clone();
        self.sign_on_at = projected.sign_on_at;
        true
    }
}

impl_record!(CPDutyChange, "cp_duty_change", |c| Some(format!(
    "{}:{}",
    c.original_id, c.employee_id
)));
