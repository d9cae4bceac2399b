//! Portal messages and their per-employee deliveries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crewjobs_core::{DomainError, DomainResult, RecordId};

use crate::employee::Employee;

/// Channel a message is delivered through.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Portal,
    Email,
}

impl core::fmt::Display for MessageType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            MessageType::Portal => f.write_str("Portal"),
            MessageType::Email => f.write_str("Email"),
        }
    }
}

/// "Notify this employee" entry owned by a [`Message`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageNotification {
    pub employee_id: RecordId,
}

/// Aggregate root: a message and the employees it must reach.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Option<RecordId>,
    pub subject: String,
    pub content: String,
    pub message_type: MessageType,
    pub sent_at: Option<DateTime<Utc>>,
    notifications: Vec<MessageNotification>,
}

impl Message {
    pub fn new(subject: impl Into<String>, content: impl Into<String>, message_type: MessageType) -> Self {
        Self {
            id: None,
            subject: subject.into(),
            content: content.into(),
            message_type,
            sent_at: None,
            notifications: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: RecordId) -> Self {
        self.id = Some(id);
        self
    }

    /// Add a notification for `employee_id`; each employee may be notified once.
    pub fn notify(&mut self, employee_id: RecordId) -> DomainResult<()> {
        if self.notifications.iter().any(|n| n.employee_id == employee_id) {
            return Err(self.duplicate(employee_id));
        }
        self.notifications.push(MessageNotification { employee_id });
        Ok(())
    }

    /// Notifications in the order they were declared.
    pub fn notifications(&self) -> &[MessageNotification] {
        &self.notifications
    }

    pub fn is_sent(&self) -> bool {
        self.sent_at.is_some()
    }

    pub fn mark_sent(&mut self, at: DateTime<Utc>) {
        self.sent_at = Some(at);
    }

    /// Identity plus unique notifications; needed before deliveries can reference it.
    pub fn check_deliverable(&self) -> DomainResult<RecordId> {
        let id = self
            .id
            .ok_or_else(|| DomainError::validation("message has no identity and cannot be delivered"))?;

        let mut seen = Vec::with_capacity(self.notifications.len());
        for notification in &self.notifications {
            if seen.contains(&notification.employee_id) {
                return Err(self.duplicate(notification.employee_id));
            }
            seen.push(notification.employee_id);
        }
        Ok(id)
    }

    fn duplicate(&self, employee_id: RecordId) -> DomainError {
        DomainError::Duplicate {
            kind: "message_notification",
            parent: "message",
            parent_id: self.id.map(RecordId::get).unwrap_or_default(),
            child_id: employee_id.get(),
        }
    }
}

impl_record!(Message, "message");

/// One delivered copy of a message, addressed to one employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEmployeeUser {
    pub id: Option<RecordId>,
    pub message_id: RecordId,
    pub employee_id: RecordId,
    pub subject: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl MessageEmployeeUser {
    pub fn deliver(message_id: RecordId, message: &Message, employee_id: RecordId, at: DateTime<Utc>) -> Self {
        Self {
            id: None,
            message_id,
            employee_id,
            subject: message.subject.clone(),
            content: message.content.clone(),
            created_at: at,
        }
    }

    /// Delivery addressed to a resolved employee record.
    pub fn for_employee(
        message_id: RecordId,
        message: &Message,
        employee: &Employee,
        at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let employee_id = employee
            .id
            .ok_or_else(|| DomainError::validation("employee has no identity"))?;
        Ok(Self::deliver(message_id, message, employee_id, at))
    }

    pub fn key(&self) -> (RecordId, RecordId) {
        (self.message_id, self.employee_id)
    }
}

impl_record!(MessageEmployeeUser, "message_employee_user", |d| Some(format!(
    "{}:{}",
    d.message_id, d.employee_id
)));

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn message() -> Message {
        Message::new("None", "Test Content", MessageType::Portal).with_id(RecordId::new(1))
    }

    #[test]
    fn notify_keeps_declaration_order() {
        let mut msg = message();
        msg.notify(RecordId::new(6)).unwrap();
        msg.notify(RecordId::new(5)).unwrap();

        let ids: Vec<i64> = msg.notifications().iter().map(|n| n.employee_id.get()).collect();
        assert_eq!(ids, vec![6, 5]);
    }

    #[test]
    fn notifying_the_same_employee_twice_is_rejected() {
        let mut msg = message();
        msg.notify(RecordId::new(5)).unwrap();

        let err = msg.notify(RecordId::new(5)).unwrap_err();

        assert_eq!(
            err,
            DomainError::Duplicate {
                kind: "message_notification",
                parent: "message",
                parent_id: 1,
                child_id: 5,
            }
        );
        assert_eq!(msg.notifications().len(), 1);
    }

    #[test]
    fn unsaved_message_is_not_deliverable() {
        let msg = Message::new("s", "c", MessageType::Portal);
        assert!(matches!(msg.check_deliverable(), Err(DomainError::Validation(_))));
        assert_eq!(message().check_deliverable().unwrap(), RecordId::new(1));
    }

    #[test]
    fn delivery_copies_message_text() {
        let at = Utc.with_ymd_and_hms(2011, 1, 1, 0, 0, 0).unwrap();
        let employee = Employee::new("E5", "Five").with_id(RecordId::new(5));

        let delivery = MessageEmployeeUser::for_employee(RecordId::new(1), &message(), &employee, at).unwrap();

        assert_eq!(delivery.content, "Test Content");
        assert_eq!(delivery.subject, "None");
        assert_eq!(delivery.key(), (RecordId::new(1), RecordId::new(5)));
        assert_eq!(delivery.created_at, at);
    }

    #[test]
    fn mark_sent() {
        let mut msg = message();
        assert!(!msg.is_sent());
        msg.mark_sent(Utc.with_ymd_and_hms(2011, 1, 1, 0, 0, 0).unwrap());
        assert!(msg.is_sent());
    }
}
