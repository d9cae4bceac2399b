//! Infrastructure layer: data-access seam implementations.
//!
//! Production stores (SQL, ORM) live outside this workspace and only need to
//! implement [`crewjobs_engine::DataAccess`].

pub mod data_access;

pub use data_access::{InMemoryDataAccess, RecordedCall, RecordingDataAccess};
