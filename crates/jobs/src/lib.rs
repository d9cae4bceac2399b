//! Batch jobs for the crew portal.
//!
//! - [`SendEmployeeMessageJob`]: fan a portal message out to the notified employees
//! - [`UpdateCpDutyJob`]: keep the portal's duty-change projection in sync

use crewjobs_crew::MessageType;
use crewjobs_engine::{DataAccess, JobRegistry, RegistryError};

pub mod send_employee_message;
pub mod update_cp_duty;

pub use send_employee_message::{SendEmployeeMessageJob, PORTAL_NOTIFICATION_WORK};
pub use update_cp_duty::{
    DutyWindow, UpdateCpDutyJob, DEFAULT_SHOW_DUTY_HOURS_AFTER, DEFAULT_SHOW_DUTY_HOURS_BEFORE,
    SHOW_DUTY_HOURS_AFTER, SHOW_DUTY_HOURS_BEFORE,
};

/// A job that produces messages for one delivery channel.
pub trait MessageJob {
    fn message_type(&self) -> MessageType;
}

/// Register every job in this crate.
pub fn register_all<D: DataAccess + 'static>(registry: &mut JobRegistry<D>) -> Result<(), RegistryError> {
    registry.register(SendEmployeeMessageJob::<D>::new)?;
    registry.register(UpdateCpDutyJob::<D>::new)?;
    Ok(())
}
