//! Redis-backed document store (optional).
//!
//! Each employee is one hash at `{prefix}:{id}`. The hash always carries an
//! `_id` field next to the supplied attributes, so the key exists exactly as
//! long as the document does. A set at `{prefix}:ids` indexes every document
//! for listing.
//!
//! Writes that must inspect and modify a document atomically run as Lua
//! scripts. Every operation opens its own multiplexed connection and drops it
//! when done; connecting plus the command run under the store's time budget.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Script};
use tracing::instrument;

use roster_core::{DocumentId, Employee, EmployeeFields};

use super::r#trait::{
    bounded, EmployeeStore, StoreError, StoreResult, UpdateOutcome, DEFAULT_STORE_TIMEOUT,
};

const ID_FIELD: &str = "_id";

/// KEYS[1] document, KEYS[2] id set; ARGV[1..2] the `_id` pair, then field/value pairs.
const CREATE_SCRIPT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 1 then
    return 0
end
redis.call('HSET', KEYS[1], ARGV[1], ARGV[2], unpack(ARGV, 3))
redis.call('SADD', KEYS[2], ARGV[2])
return 1
"#;

/// KEYS[1] document; ARGV field/value pairs. Returns {matched, modified}.
const UPDATE_SCRIPT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 0 then
    return {0, 0}
end
local modified = 0
for i = 1, #ARGV, 2 do
    if redis.call('HGET', KEYS[1], ARGV[i]) ~= ARGV[i + 1] then
        redis.call('HSET', KEYS[1], ARGV[i], ARGV[i + 1])
        modified = 1
    end
end
return {1, modified}
"#;

/// KEYS[1] document, KEYS[2] id set; ARGV[1] id.
const DELETE_SCRIPT: &str = r#"
local deleted = redis.call('DEL', KEYS[1])
redis.call('SREM', KEYS[2], ARGV[1])
return deleted
"#;

#[derive(Debug, Clone)]
pub struct RedisEmployeeStore {
    client: redis::Client,
    prefix: String,
    timeout: Duration,
}

impl RedisEmployeeStore {
    /// Build a store without touching the server.
    pub fn new(redis_url: impl AsRef<str>, prefix: impl Into<String>) -> StoreResult<Self> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| StoreError::unavailable(format!("invalid redis url: {e}")))?;
        Ok(Self {
            client,
            prefix: prefix.into(),
            timeout: DEFAULT_STORE_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build a store and check that the server answers `PING`.
    pub async fn connect(
        redis_url: impl AsRef<str>,
        prefix: impl Into<String>,
        timeout: Duration,
    ) -> StoreResult<Self> {
        let store = Self::new(redis_url, prefix)?.with_timeout(timeout);
        bounded(timeout, "connect", async {
            let mut conn = store.connection().await?;
            let _: String = redis::cmd("PING")
                .query_async(&mut conn)
                .await
                .map_err(|e| StoreError::unavailable(format!("redis did not answer: {e}")))?;
            Ok(())
        })
        .await?;
        Ok(store)
    }

    fn doc_key(&self, id: &DocumentId) -> String {
        format!("{}:{}", self.prefix, id)
    }

    fn ids_key(&self) -> String {
        format!("{}:ids", self.prefix)
    }

    async fn connection(&self) -> StoreResult<MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StoreError::unavailable(format!("redis connection failed: {e}")))
    }
}

fn map_redis_error(operation: &str, err: redis::RedisError) -> StoreError {
    if err.is_io_error()
        || err.is_connection_refusal()
        || err.is_connection_dropped()
        || err.is_timeout()
    {
        StoreError::unavailable(format!("redis error in {operation}: {err}"))
    } else {
        StoreError::unknown(err)
    }
}

fn fields_from_hash(hash: HashMap<String, String>) -> EmployeeFields {
    let mut fields = EmployeeFields::default();
    for (name, value) in hash {
        if name != ID_FIELD {
            fields.set(&name, value);
        }
    }
    fields
}

#[async_trait]
impl EmployeeStore for RedisEmployeeStore {
    type Id = DocumentId;

    fn backend(&self) -> &'static str {
        "redis"
    }

    #[instrument(skip(self, fields), err)]
    async fn create(&self, fields: EmployeeFields) -> StoreResult<DocumentId> {
        let id = DocumentId::new();
        bounded(self.timeout, "create", async {
            let mut conn = self.connection().await?;
            let script = Script::new(CREATE_SCRIPT);
            let mut invocation = script.key(self.doc_key(&id));
            invocation.key(self.ids_key()).arg(ID_FIELD).arg(id.to_string());
            for (name, value) in fields.present() {
                invocation.arg(name).arg(value);
            }

            let created: u64 = invocation
                .invoke_async(&mut conn)
                .await
                .map_err(|e| map_redis_error("create", e))?;
            if created == 0 {
                return Err(StoreError::constraint(format!("document {id} already exists")));
            }
            Ok(id)
        })
        .await
    }

    #[instrument(skip(self, id), fields(id = %id), err)]
    async fn find_by_id(&self, id: &DocumentId) -> StoreResult<Employee<DocumentId>> {
        bounded(self.timeout, "find_by_id", async {
            let mut conn = self.connection().await?;
            let hash: HashMap<String, String> = conn
                .hgetall(self.doc_key(id))
                .await
                .map_err(|e| map_redis_error("find_by_id", e))?;

            if hash.is_empty() {
                return Err(StoreError::NotFound);
            }
            Ok(Employee::new(*id, fields_from_hash(hash)))
        })
        .await
    }

    /// Documents come back ordered by identifier, which for UUIDv7 follows
    /// creation time.
    #[instrument(skip(self), err)]
    async fn find_all(&self) -> StoreResult<Vec<Employee<DocumentId>>> {
        bounded(self.timeout, "find_all", async {
            let mut conn = self.connection().await?;
            let raw_ids: Vec<String> = conn
                .smembers(self.ids_key())
                .await
                .map_err(|e| map_redis_error("find_all", e))?;

            let mut ids = raw_ids
                .iter()
                .map(|raw| {
                    raw.parse::<DocumentId>().map_err(|e| {
                        StoreError::unknown(anyhow::anyhow!("corrupt id set entry: {e}"))
                    })
                })
                .collect::<StoreResult<Vec<_>>>()?;
            ids.sort();
            if ids.is_empty() {
                return Ok(Vec::new());
            }

            let mut pipe = redis::pipe();
            for id in &ids {
                pipe.hgetall(self.doc_key(id));
            }
            let hashes: Vec<HashMap<String, String>> = pipe
                .query_async(&mut conn)
                .await
                .map_err(|e| map_redis_error("find_all", e))?;

            // A document deleted between the two round trips reads as empty.
            Ok(ids
                .into_iter()
                .zip(hashes)
                .filter(|(_, hash)| !hash.is_empty())
                .map(|(id, hash)| Employee::new(id, fields_from_hash(hash)))
                .collect())
        })
        .await
    }

    #[instrument(skip(self, id, patch), fields(id = %id), err)]
    async fn update_by_id(&self, id: &DocumentId, patch: EmployeeFields) -> StoreResult<UpdateOutcome> {
        bounded(self.timeout, "update_by_id", async {
            let mut conn = self.connection().await?;
            let script = Script::new(UPDATE_SCRIPT);
            let mut invocation = script.key(self.doc_key(id));
            for (name, value) in patch.present() {
                invocation.arg(name).arg(value);
            }

            let counts: Vec<u64> = invocation
                .invoke_async(&mut conn)
                .await
                .map_err(|e| map_redis_error("update_by_id", e))?;
            Ok(UpdateOutcome {
                matched_count: counts.first().copied().unwrap_or(0),
                modified_count: counts.get(1).copied().unwrap_or(0),
            })
        })
        .await
    }

    #[instrument(skip(self, id), fields(id = %id), err)]
    async fn delete_by_id(&self, id: &DocumentId) -> StoreResult<u64> {
        bounded(self.timeout, "delete_by_id", async {
            let mut conn = self.connection().await?;
            let deleted: u64 = Script::new(DELETE_SCRIPT)
                .key(self.doc_key(id))
                .key(self.ids_key())
                .arg(id.to_string())
                .invoke_async(&mut conn)
                .await
                .map_err(|e| map_redis_error("delete_by_id", e))?;
            Ok(deleted)
        })
        .await
    }
}
