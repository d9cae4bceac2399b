//! Data-access seam implementations.

pub mod in_memory;
pub mod recording;

pub use in_memory::InMemoryDataAccess;
pub use recording::{RecordedCall, RecordingDataAccess};
