//! Crew portal records manipulated by batch jobs.
//!
//! Plain data records with store-assigned identity. Aggregate roots
//! ([`Message`], [`DutyChangeAggregate`]) own their child collections and
//! guard the "one child per (parent, employee)" rule.

#[macro_use]
mod record;

pub mod company;
pub mod duty_change;
pub mod employee;
pub mod message;
pub mod portal;

pub use company::CompanyParameter;
pub use duty_change::{
    Acknowledgement, DutyChangeAggregate, Pairing, PairingDutyChange, PairingDutyChangeEmployee, Port,
};
pub use employee::Employee;
pub use message::{Message, MessageEmployeeUser, MessageNotification, MessageType};
pub use portal::CPDutyChange;
