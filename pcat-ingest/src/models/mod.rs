//! Data models for pcat-ingest
//!
//! - Categories and track records as exchanged with the backend
//! - Result set (one ordered bucket per category)
//! - Progress, session state machine and published snapshots

pub mod category;
pub mod progress;
pub mod result_set;
pub mod session_state;
pub mod snapshot;
pub mod track;

pub use category::Category;
pub use progress::ProgressState;
pub use result_set::{Bucket, ResultSet};
pub use session_state::{SessionState, StateTransition};
pub use snapshot::{SessionUpdate, Snapshot};
pub use track::TrackRecord;
