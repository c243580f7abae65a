//! Data models for the gate-code dataset.
//!
//! - `AccessCodeRecord`: one address with its community, gate code and type
//! - `TypeFilter`: the active type filter (a specific type or "All")

pub mod record;

pub use record::{AccessCodeRecord, TypeFilter, DEFAULT_COMMUNITY, DEFAULT_TYPE, NO_CODE};
