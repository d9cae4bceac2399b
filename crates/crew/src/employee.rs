use serde::{Deserialize, Serialize};

use crewjobs_core::RecordId;

/// A crew member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: Option<RecordId>,
    pub staff_number: String,
    pub name: String,
}

impl Employee {
    pub fn new(staff_number: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: None,
            staff_number: staff_number.into(),
            name: name.into(),
        }
    }

    pub fn with_id(mut self, id: RecordId) -> Self {
        self.id = Some(id);
        self
    }
}

impl_record!(Employee, "employee");
