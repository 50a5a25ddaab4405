use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use roster_core::{DomainError, Employee, EmployeeFields, RecordId};

/// Default budget for a single call to an external backend.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(10);

/// Result type returned by every [`EmployeeStore`] operation.
pub type StoreResult<T> = Result<T, StoreError>;

/// Counts reported by an update.
///
/// `matched_count` says whether a record with the identifier existed,
/// `modified_count` whether any stored value actually changed. Backends that
/// can tell the two apart must not collapse them.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub matched_count: u64,
    pub modified_count: u64,
}

impl UpdateOutcome {
    pub const NO_MATCH: Self = Self {
        matched_count: 0,
        modified_count: 0,
    };

    pub fn matched(modified: bool) -> Self {
        Self {
            matched_count: 1,
            modified_count: u64::from(modified),
        }
    }
}

/// Storage operation error.
///
/// These are **infrastructure errors** surfaced by every backend. Backend-native
/// errors that fit no other category are kept as the `source` of `Unknown`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The identifier is malformed for this backend.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// No record has the identifier.
    #[error("not found")]
    NotFound,

    /// Connection failure or timeout.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The backend rejected the write (e.g. uniqueness).
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// Any other backend error.
    #[error("backend error: {0}")]
    Unknown(#[source] anyhow::Error),
}

impl StoreError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::BackendUnavailable(msg.into())
    }

    pub fn constraint(msg: impl Into<String>) -> Self {
        Self::ConstraintViolation(msg.into())
    }

    pub fn unknown(err: impl Into<anyhow::Error>) -> Self {
        Self::Unknown(err.into())
    }
}

impl From<DomainError> for StoreError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::InvalidId(msg) => StoreError::InvalidIdentifier(msg),
            DomainError::NotFound => StoreError::NotFound,
            other => StoreError::unknown(other),
        }
    }
}

/// Uniform persistence boundary for employee records.
///
/// One implementation exists per backend kind. The identifier type is fixed by
/// the backend, so request handling code stays generic over `S: EmployeeStore`
/// and never branches on the backend per request.
#[async_trait]
pub trait EmployeeStore: Send + Sync + 'static {
    /// Identifier scheme assigned by this backend.
    type Id: RecordId;

    /// Short backend name used in logs.
    fn backend(&self) -> &'static str;

    /// Persist a new record under a freshly assigned identifier.
    async fn create(&self, fields: EmployeeFields) -> StoreResult<Self::Id>;

    /// Fetch one record. Absence is `StoreError::NotFound`.
    async fn find_by_id(&self, id: &Self::Id) -> StoreResult<Employee<Self::Id>>;

    /// Every stored record; empty when the store is empty.
    async fn find_all(&self) -> StoreResult<Vec<Employee<Self::Id>>>;

    /// Overwrite the attributes present in `patch`.
    async fn update_by_id(&self, id: &Self::Id, patch: EmployeeFields) -> StoreResult<UpdateOutcome>;

    /// Remove a record, returning how many were deleted (0 or 1).
    async fn delete_by_id(&self, id: &Self::Id) -> StoreResult<u64>;
}

/// Run a backend call under a time budget; overrunning it is `BackendUnavailable`.
pub async fn bounded<T, F>(budget: Duration, operation: &'static str, fut: F) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    match tokio::time::timeout(budget, fut).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::unavailable(format!(
            "{operation} timed out after {}ms",
            budget.as_millis()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn overrunning_the_budget_is_backend_unavailable() {
        let res: StoreResult<()> = bounded(Duration::from_millis(5), "find_all", async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(())
        })
        .await;

        match res {
            Err(StoreError::BackendUnavailable(msg)) => assert!(msg.contains("find_all")),
            other => panic!("expected BackendUnavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn results_inside_the_budget_pass_through() {
        let res = bounded(Duration::from_secs(1), "create", async {
            Err::<(), _>(StoreError::constraint("duplicate id"))
        })
        .await;
        assert!(matches!(res, Err(StoreError::ConstraintViolation(_))));
    }

    #[test]
    fn domain_errors_map_onto_store_taxonomy() {
        assert!(matches!(
            StoreError::from(DomainError::invalid_id("x")),
            StoreError::InvalidIdentifier(_)
        ));
        assert!(matches!(StoreError::from(DomainError::NotFound), StoreError::NotFound));
    }
}
