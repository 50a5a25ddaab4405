//! `roster-core`: the employee record and its identifiers.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).
//! It is the shared vocabulary between the HTTP mapper, the CRUD service and
//! every storage backend.

pub mod entity;
pub mod error;
pub mod id;

pub use entity::{Employee, EmployeeFields};
pub use error::{DomainError, DomainResult};
pub use id::{DocumentId, RecordId, RowId, SequenceId};
