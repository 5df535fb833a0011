//! Pure domain logic for the dataport migration engine.
//!
//! Everything in this crate is deterministic given its inputs: no database
//! access, no network I/O, no async. The workflow crate layers orchestration
//! on top; the client crate carries these types over the wire.

pub mod error;
pub mod export;
pub mod file_check;
pub mod import;
pub mod template;
pub mod types;

pub use error::CoreError;
