//! CRUD orchestration over a single [`EmployeeStore`].
//!
//! `CrudService` sits between the HTTP layer and the store. It turns raw path
//! segments into backend identifiers, validates incoming attributes and maps
//! store failures into a `ServiceError` the HTTP layer can translate without
//! knowing which backend is active.
//!
//! ```text
//! raw id / fields
//!   ↓
//! 1. Parse identifier (fails before any store call)
//!   ↓
//! 2. Validate attributes
//!   ↓
//! 3. Store operation
//!   ↓
//! Employee / receipt / ServiceError
//! ```
//!
//! The service holds no state beyond its store.

use thiserror::Error;
use tracing::{debug, warn};

use roster_core::{DomainError, Employee, EmployeeFields};

use crate::store::{EmployeeStore, StoreError};

#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request carried attribute values that cannot be stored.
    #[error("validation failed: {0}")]
    Validation(String),
    /// The path identifier does not parse for the active backend.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
    /// No record has the identifier.
    #[error("not found")]
    NotFound,
    /// Any other storage failure.
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::InvalidIdentifier(msg) => ServiceError::InvalidIdentifier(msg),
            StoreError::NotFound => ServiceError::NotFound,
            other => ServiceError::Store(other),
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => ServiceError::Validation(msg),
            DomainError::InvalidId(msg) => ServiceError::InvalidIdentifier(msg),
            DomainError::NotFound => ServiceError::NotFound,
        }
    }
}

/// Outcome of an update. Zero matches is a successful no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateReceipt<I> {
    pub id: I,
    pub matched_count: u64,
    pub modified_count: u64,
}

/// Outcome of a delete. Zero deleted is a successful no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteReceipt<I> {
    pub id: I,
    pub deleted_count: u64,
}

#[derive(Debug)]
pub struct CrudService<S> {
    store: S,
}

impl<S> CrudService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S: EmployeeStore> CrudService<S> {
    /// Parse a raw path segment into the active backend's identifier.
    pub fn parse_id(&self, raw: &str) -> Result<S::Id, ServiceError> {
        raw.parse::<S::Id>().map_err(|e| {
            debug!(backend = self.store.backend(), raw, "rejected identifier");
            ServiceError::from(e)
        })
    }

    pub async fn create_employee(
        &self,
        fields: EmployeeFields,
    ) -> Result<Employee<S::Id>, ServiceError> {
        fields.validate()?;

        let id = self
            .store
            .create(fields.clone())
            .await
            .map_err(|e| self.failed("create", None, e))?;

        debug!(backend = self.store.backend(), %id, "employee created");
        Ok(Employee::new(id, fields))
    }

    pub async fn get_employee(&self, raw_id: &str) -> Result<Employee<S::Id>, ServiceError> {
        let id = self.parse_id(raw_id)?;
        let employee = self
            .store
            .find_by_id(&id)
            .await
            .map_err(|e| self.failed("get", Some(raw_id), e))?;

        debug!(backend = self.store.backend(), %id, "employee fetched");
        Ok(employee)
    }

    pub async fn list_employees(&self) -> Result<Vec<Employee<S::Id>>, ServiceError> {
        let employees = self
            .store
            .find_all()
            .await
            .map_err(|e| self.failed("list", None, e))?;

        debug!(backend = self.store.backend(), count = employees.len(), "employees listed");
        Ok(employees)
    }

    /// Overwrite the attributes present in `patch`; absent ones are kept.
    pub async fn update_employee(
        &self,
        raw_id: &str,
        patch: EmployeeFields,
    ) -> Result<UpdateReceipt<S::Id>, ServiceError> {
        let id = self.parse_id(raw_id)?;
        patch.validate()?;

        let outcome = self
            .store
            .update_by_id(&id, patch)
            .await
            .map_err(|e| self.failed("update", Some(raw_id), e))?;

        debug!(
            backend = self.store.backend(),
            %id,
            matched = outcome.matched_count,
            modified = outcome.modified_count,
            "employee updated"
        );
        Ok(UpdateReceipt {
            id,
            matched_count: outcome.matched_count,
            modified_count: outcome.modified_count,
        })
    }

    pub async fn delete_employee(&self, raw_id: &str) -> Result<DeleteReceipt<S::Id>, ServiceError> {
        let id = self.parse_id(raw_id)?;
        let deleted_count = self
            .store
            .delete_by_id(&id)
            .await
            .map_err(|e| self.failed("delete", Some(raw_id), e))?;

        debug!(backend = self.store.backend(), %id, deleted = deleted_count, "employee deleted");
        Ok(DeleteReceipt { id, deleted_count })
    }

    fn failed(&self, operation: &'static str, raw_id: Option<&str>, err: StoreError) -> ServiceError {
        match &err {
            // Expected outcome of a lookup, not worth a warning.
            StoreError::NotFound => {
                debug!(backend = self.store.backend(), operation, id = raw_id, "employee not found")
            }
            _ => warn!(
                backend = self.store.backend(),
                operation,
                id = raw_id,
                error = %err,
                "store operation failed"
            ),
        }
        ServiceError::from(err)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use roster_core::SequenceId;

    use super::*;
    use crate::store::{InMemoryEmployeeStore, StoreResult, UpdateOutcome};

    /// Counts every call that reaches the store, then delegates.
    #[derive(Default)]
    struct CountingStore {
        inner: InMemoryEmployeeStore,
        calls: Arc<AtomicUsize>,
    }

    impl CountingStore {
        fn hit(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl EmployeeStore for CountingStore {
        type Id = SequenceId;

        fn backend(&self) -> &'static str {
            "counting"
        }

        async fn create(&self, fields: EmployeeFields) -> StoreResult<SequenceId> {
            self.hit();
            self.inner.create(fields).await
        }

        async fn find_by_id(&self, id: &SequenceId) -> StoreResult<Employee<SequenceId>> {
            self.hit();
            self.inner.find_by_id(id).await
        }

        async fn find_all(&self) -> StoreResult<Vec<Employee<SequenceId>>> {
            self.hit();
            self.inner.find_all().await
        }

        async fn update_by_id(&self, id: &SequenceId, patch: EmployeeFields) -> StoreResult<UpdateOutcome> {
            self.hit();
            self.inner.update_by_id(id, patch).await
        }

        async fn delete_by_id(&self, id: &SequenceId) -> StoreResult<u64> {
            self.hit();
            self.inner.delete_by_id(id).await
        }
    }

    /// Fails every call with the given error kind.
    struct FailingStore;

    #[async_trait]
    impl EmployeeStore for FailingStore {
        type Id = SequenceId;

        fn backend(&self) -> &'static str {
            "failing"
        }

        async fn create(&self, _fields: EmployeeFields) -> StoreResult<SequenceId> {
            Err(StoreError::constraint("duplicate key"))
        }

        async fn find_by_id(&self, _id: &SequenceId) -> StoreResult<Employee<SequenceId>> {
            Err(StoreError::unavailable("connection refused"))
        }

        async fn find_all(&self) -> StoreResult<Vec<Employee<SequenceId>>> {
            Err(StoreError::unknown(anyhow::anyhow!("boom")))
        }

        async fn update_by_id(&self, _id: &SequenceId, _patch: EmployeeFields) -> StoreResult<UpdateOutcome> {
            Err(StoreError::unavailable("timed out"))
        }

        async fn delete_by_id(&self, _id: &SequenceId) -> StoreResult<u64> {
            Err(StoreError::unavailable("timed out"))
        }
    }

    fn named(name: &str) -> EmployeeFields {
        EmployeeFields {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn malformed_identifiers_never_reach_the_store() {
        let store = CountingStore::default();
        let calls = store.calls.clone();
        let service = CrudService::new(store);

        for raw in ["abc", "-1", "", "1.5"] {
            assert!(matches!(service.get_employee(raw).await, Err(ServiceError::InvalidIdentifier(_))));
            assert!(matches!(
                service.update_employee(raw, named("x")).await,
                Err(ServiceError::InvalidIdentifier(_))
            ));
            assert!(matches!(service.delete_employee(raw).await, Err(ServiceError::InvalidIdentifier(_))));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalid_attributes_never_reach_the_store() {
        let store = CountingStore::default();
        let calls = store.calls.clone();
        let service = CrudService::new(store);

        assert!(matches!(service.create_employee(named("a\0b")).await, Err(ServiceError::Validation(_))));
        assert!(matches!(
            service.update_employee("1", named("a\0b")).await,
            Err(ServiceError::Validation(_))
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn create_returns_the_assigned_id_with_the_submitted_fields() {
        let service = CrudService::new(InMemoryEmployeeStore::new());

        let created = service.create_employee(named("Ada")).await.unwrap();
        assert_eq!(created.id, SequenceId::new(1));
        assert_eq!(created.fields, named("Ada"));

        let empty = service.create_employee(EmployeeFields::default()).await.unwrap();
        assert_eq!(service.get_employee(&empty.id.to_string()).await.unwrap().fields, EmployeeFields::default());
    }

    #[tokio::test]
    async fn update_and_delete_of_missing_records_succeed_with_zero_counts() {
        let service = CrudService::new(InMemoryEmployeeStore::new());

        let receipt = service.update_employee("404", named("x")).await.unwrap();
        assert_eq!(
            receipt,
            UpdateReceipt { id: SequenceId::new(404), matched_count: 0, modified_count: 0 }
        );

        let receipt = service.delete_employee("404").await.unwrap();
        assert_eq!(receipt, DeleteReceipt { id: SequenceId::new(404), deleted_count: 0 });
    }

    #[tokio::test]
    async fn backend_failures_stay_store_errors() {
        let service = CrudService::new(FailingStore);

        assert!(matches!(
            service.create_employee(named("a")).await,
            Err(ServiceError::Store(StoreError::ConstraintViolation(_)))
        ));
        assert!(matches!(
            service.get_employee("1").await,
            Err(ServiceError::Store(StoreError::BackendUnavailable(_)))
        ));
        assert!(matches!(
            service.list_employees().await,
            Err(ServiceError::Store(StoreError::Unknown(_)))
        ));
        assert!(matches!(
            service.update_employee("1", named("x")).await,
            Err(ServiceError::Store(StoreError::BackendUnavailable(_)))
        ));
        assert!(matches!(
            service.delete_employee("1").await,
            Err(ServiceError::Store(StoreError::BackendUnavailable(_)))
        ));
    }

    #[test]
    fn store_errors_lift_into_service_variants() {
        assert!(matches!(ServiceError::from(StoreError::NotFound), ServiceError::NotFound));
        assert!(matches!(
            ServiceError::from(StoreError::InvalidIdentifier("x".into())),
            ServiceError::InvalidIdentifier(_)
        ));
        assert!(matches!(
            ServiceError::from(StoreError::unavailable("down")),
            ServiceError::Store(StoreError::BackendUnavailable(_))
        ));
    }
}
