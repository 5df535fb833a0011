//! Import-side domain model.
//!
//! Job snapshots and statuses, the validation preview with its issue
//! taxonomy, the approval gate, and the duplicate-resolution policy --
//! all without database dependencies.

pub mod duplicates;
pub mod job;
pub mod options;
pub mod preview;
pub mod review;
pub mod status;
