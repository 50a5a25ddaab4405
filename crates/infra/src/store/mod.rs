//! Employee persistence boundary.
//!
//! One [`EmployeeStore`] implementation exists per backend kind. The backend is
//! chosen once at startup; everything above this module is generic over the
//! trait and never inspects which backend is active.

pub mod in_memory;
pub mod postgres;
#[cfg(feature = "redis")]
pub mod redis;
pub mod r#trait;

pub use in_memory::{EmployeeTable, InMemoryEmployeeStore, SharedEmployeeTable};
pub use postgres::PostgresEmployeeStore;
#[cfg(feature = "redis")]
pub use self::redis::RedisEmployeeStore;
pub use r#trait::{
    bounded, EmployeeStore, StoreError, StoreResult, UpdateOutcome, DEFAULT_STORE_TIMEOUT,
};
