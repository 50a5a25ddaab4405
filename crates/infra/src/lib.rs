//! Infrastructure layer: storage backends and the CRUD service over them.

pub mod crud_service;
pub mod store;


pub use crud_service::{CrudService, DeleteReceipt, ServiceError, UpdateReceipt};
pub use store::{EmployeeStore, StoreError, StoreResult, UpdateOutcome};
