use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use roster_core::{Employee, EmployeeFields, SequenceId};

use super::r#trait::{EmployeeStore, StoreError, StoreResult, UpdateOutcome};

/// Process-local employee table: the records plus the identifier counter.
///
/// Keys are handed out in increasing order, so iterating the map yields
/// records in insertion order.
#[derive(Debug)]
pub struct EmployeeTable {
    records: BTreeMap<u64, EmployeeFields>,
    next_id: u64,
}

impl EmployeeTable {
    pub fn new() -> Self {
        Self {
            records: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl Default for EmployeeTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared handle to an [`EmployeeTable`].
pub type SharedEmployeeTable = Arc<RwLock<EmployeeTable>>;

/// In-memory employee store for tests/dev.
///
/// Every read takes the read lock and every write the write lock, so
/// concurrent creates never reuse an identifier and listing never observes a
/// half-applied update. The lock is never held across an `.await`.
#[derive(Debug, Clone)]
pub struct InMemoryEmployeeStore {
    table: SharedEmployeeTable,
}

impl InMemoryEmployeeStore {
    pub fn new() -> Self {
        Self::with_table(Arc::new(RwLock::new(EmployeeTable::new())))
    }

    /// Build a store over an existing table (several stores may share one).
    pub fn with_table(table: SharedEmployeeTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &SharedEmployeeTable {
        &self.table
    }
}

impl Default for InMemoryEmployeeStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> StoreError {
    StoreError::unknown(anyhow::anyhow!("employee table lock poisoned"))
}

#[async_trait]
impl EmployeeStore for InMemoryEmployeeStore {
    type Id = SequenceId;

    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn create(&self, fields: EmployeeFields) -> StoreResult<SequenceId> {
        let mut table = self.table.write().map_err(|_| poisoned())?;

        let id = table.next_id;
        if table.records.contains_key(&id) {
            return Err(StoreError::constraint(format!("identifier {id} already assigned")));
        }
        table.next_id = id
            .checked_add(1)
            .ok_or_else(|| StoreError::constraint("identifier space exhausted"))?;
        table.records.insert(id, fields);

        Ok(SequenceId::new(id))
    }

    async fn find_by_id(&self, id: &SequenceId) -> StoreResult<Employee<SequenceId>> {
        let table = self.table.read().map_err(|_| poisoned())?;
        table
            .records
            .get(&id.get())
            .map(|fields| Employee::new(*id, fields.clone()))
            .ok_or(StoreError::NotFound)
    }

    async fn find_all(&self) -> StoreResult<Vec<Employee<SequenceId>>> {
        let table = self.table.read().map_err(|_| poisoned())?;
        Ok(table
            .records
            .iter()
            .map(|(id, fields)| Employee::new(SequenceId::new(*id), fields.clone()))
            .collect())
    }

    async fn update_by_id(&self, id: &SequenceId, patch: EmployeeFields) -> StoreResult<UpdateOutcome> {
        let mut table = self.table.write().map_err(|_| poisoned())?;
        match table.records.get_mut(&id.get()) {
            Some(stored) => Ok(UpdateOutcome::matched(stored.apply(patch))),
            None => Ok(UpdateOutcome::NO_MATCH),
        }
    }

    async fn delete_by_id(&self, id: &SequenceId) -> StoreResult<u64> {
        let mut table = self.table.write().map_err(|_| poisoned())?;
        Ok(u64::from(table.records.remove(&id.get()).is_some()))
    }
}
