//! Fan portal messages out to the employees they notify.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::debug;

use crewjobs_core::{DomainError, RecordId};
use crewjobs_crew::{Employee, Message, MessageEmployeeUser, MessageType};
use crewjobs_engine::{
    ContextSlot, DataAccess, Job, JobContext, JobError, JobResult, JobType, QueuedWork, Record,
};

use crate::MessageJob;

/// Queue kind for "tell the portal about a new delivery".
pub const PORTAL_NOTIFICATION_WORK: &str = "portal_notification";

/// Delivers unsent portal messages as one [`MessageEmployeeUser`] per notified employee.
///
/// A notification for an employee that does not resolve fails the run and
/// nothing is saved for it.
pub struct SendEmployeeMessageJob<D> {
    context: ContextSlot<D>,
}

impl<D: DataAccess> SendEmployeeMessageJob<D> {
    pub const JOB_TYPE: JobType = JobType::new("send_employee_message");

    pub fn new() -> Self {
        Self {
            context: ContextSlot::empty(),
        }
    }

    /// Persist one delivery per notification of `message`, in a single batch.
    pub fn send_message(&self, message: &Message) -> Result<Vec<MessageEmployeeUser>, JobError> {
        let ctx = self.context.get();
        let deliveries = Self::deliveries_for(ctx, message, ctx.now())?;
        if deliveries.is_empty() {
            return Ok(Vec::new());
        }

        let saved = ctx.data_access.save(deliveries, true)?;
        ctx.logger.info(&format!(
            "message {} delivered to {} employee(s)",
            message.id.map(RecordId::get).unwrap_or_default(),
            saved.len()
        ));
        Ok(saved)
    }

    fn deliver_pending(&self) -> Result<JobResult, JobError> {
        let ctx = self.context.get();
        let now = ctx.now();
        let message_type = self.message_type();

        let pending = ctx
            .data_access
            .get(|m: &Message| m.message_type == message_type && !m.is_sent())?;
        if pending.is_empty() {
            ctx.logger.info("no pending portal messages");
            return Ok(JobResult::success("no pending portal messages"));
        }

        let pending_ids: HashSet<RecordId> = pending.iter().filter_map(|m| m.id).collect();
        let mut stored: HashMap<(RecordId, RecordId), MessageEmployeeUser> = ctx
            .data_access
            .get(|d: &MessageEmployeeUser| pending_ids.contains(&d.message_id))?
            .into_iter()
            .map(|d| (d.key(), d))
            .collect();

        let mut order = Vec::new();
        let mut fresh = Vec::new();
        for message in &pending {
            for delivery in Self::deliveries_for(ctx, message, now)? {
                order.push(delivery.key());
                if stored.contains_key(&delivery.key()) {
                    debug!(
                        message_id = %delivery.message_id,
                        employee_id = %delivery.employee_id,
                        "delivery already persisted"
                    );
                    continue;
                }
                fresh.push(delivery);
            }
        }

        let created = if fresh.is_empty() {
            0
        } else {
            let saved = ctx.data_access.save(fresh, true)?;
            let created = saved.len();
            stored.extend(saved.into_iter().map(|d| (d.key(), d)));
            created
        };

        let sent: Vec<Message> = pending
            .into_iter()
            .map(|mut message| {
                message.mark_sent(now);
                message
            })
            .collect();
        let message_count = sent.len();
        ctx.data_access.save(sent, false)?;

        // Every delivery of a pending message, including ones stored by an
        // earlier run that failed before queueing.
        for delivery in order.iter().filter_map(|key| stored.get(key)) {
            ctx.queue.enqueue(QueuedWork::new(
                PORTAL_NOTIFICATION_WORK,
                json!({
                    "delivery_id": delivery.id,
                    "message_id": delivery.message_id,
                    "employee_id": delivery.employee_id,
                }),
            ));
        }

        let summary = format!(
            "sent {message_count} message(s) as {} deliveries ({created} new)",
            order.len()
        );
        ctx.logger.info(&summary);
        Ok(JobResult::success(summary))
    }

    /// Resolve every notified employee, in declaration order.
    fn deliveries_for(
        ctx: &JobContext<D>,
        message: &Message,
        at: DateTime<Utc>,
    ) -> Result<Vec<MessageEmployeeUser>, JobError> {
        let message_id = message.check_deliverable()?;
        message
            .notifications()
            .iter()
            .map(|notification| -> Result<MessageEmployeeUser, JobError> {
                let employee = ctx
                    .data_access
                    .get_by_id::<Employee>(notification.employee_id)?
                    .ok_or_else(|| DomainError::unresolved(Employee::KIND, notification.employee_id))?;
                Ok(MessageEmployeeUser::for_employee(message_id, message, &employee, at)?)
            })
            .collect()
    }
}

impl<D: DataAccess> Default for SendEmployeeMessageJob<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> MessageJob for SendEmployeeMessageJob<D> {
    fn message_type(&self) -> MessageType {
        MessageType::Portal
    }
}

impl<D: DataAccess> Job<D> for SendEmployeeMessageJob<D> {
    fn job_type(&self) -> JobType {
        Self::JOB_TYPE
    }

    fn initialise(&mut self, context: JobContext<D>) {
        self.context.fill(context);
    }

    fn execute(&mut self) -> Result<JobResult, JobError> {
        self.deliver_pending()
    }
}
