//! Postgres-backed employee store.
//!
//! ## Schema
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS employees (
//!     id          BIGSERIAL PRIMARY KEY,
//!     name        TEXT,
//!     department  TEXT,
//!     level       TEXT,
//!     description TEXT
//! );
//! ```
//!
//! Nullable columns mirror the optional attributes: `NULL` means "never
//! supplied", `''` is a supplied empty value.
//!
//! ## Connections
//!
//! Each operation checks a connection out of the pool, uses it for exactly
//! that operation and hands it back when the guard drops, on success and on
//! every error path. Checkout and the query together run under the store's
//! time budget.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, Row};
use tracing::instrument;

use roster_core::{Employee, EmployeeFields, RowId};

use super::r#trait::{
    bounded, EmployeeStore, StoreError, StoreResult, UpdateOutcome, DEFAULT_STORE_TIMEOUT,
};

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS employees (
        id          BIGSERIAL PRIMARY KEY,
        name        TEXT,
        department  TEXT,
        level       TEXT,
        description TEXT
    )
"#;

/// Postgres-backed employee store.
#[derive(Debug, Clone)]
pub struct PostgresEmployeeStore {
    pool: PgPool,
    timeout: Duration,
}

impl PostgresEmployeeStore {
    /// Wrap an existing pool. The `employees` table must already exist.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Connect to `database_url`, verify the server answers and make sure the
    /// `employees` table exists.
    ///
    /// Any failure here is `BackendUnavailable`.
    pub async fn connect(database_url: &str, timeout: Duration) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(timeout)
            .connect_lazy(database_url)
            .map_err(|e| StoreError::unavailable(format!("invalid database url: {e}")))?;

        let store = Self::new(pool).with_timeout(timeout);
        bounded(timeout, "connect", async {
            let mut conn = store.acquire().await?;
            sqlx::query("SELECT 1")
                .execute(&mut *conn)
                .await
                .map_err(|e| StoreError::unavailable(format!("database did not answer: {e}")))?;
            sqlx::query(CREATE_TABLE)
                .execute(&mut *conn)
                .await
                .map_err(|e| map_sqlx_error("create_table", e))?;
            Ok(())
        })
        .await?;

        Ok(store)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn acquire(&self) -> StoreResult<PoolConnection<Postgres>> {
        self.pool.acquire().await.map_err(|e| map_sqlx_error("acquire", e))
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            // SQLSTATE class 23: integrity constraint violation.
            let is_constraint = db_err.code().is_some_and(|code| code.starts_with("23"));
            if is_constraint {
                StoreError::constraint(format!("database error in {}: {}", operation, db_err.message()))
            } else {
                StoreError::unknown(sqlx::Error::Database(db_err))
            }
        }
        sqlx::Error::PoolTimedOut => {
            StoreError::unavailable(format!("timed out waiting for a connection in {operation}"))
        }
        sqlx::Error::PoolClosed => {
            StoreError::unavailable(format!("connection pool closed in {operation}"))
        }
        sqlx::Error::Io(e) => StoreError::unavailable(format!("io error in {operation}: {e}")),
        sqlx::Error::Tls(e) => StoreError::unavailable(format!("tls error in {operation}: {e}")),
        sqlx::Error::RowNotFound => StoreError::NotFound,
        other => StoreError::unknown(other),
    }
}

fn row_to_employee(row: &PgRow) -> StoreResult<Employee<RowId>> {
    let get = |column: &str| -> StoreResult<Option<String>> {
        row.try_get::<Option<String>, _>(column)
            .map_err(|e| map_sqlx_error("decode_row", e))
    };

    let id: i64 = row.try_get("id").map_err(|e| map_sqlx_error("decode_row", e))?;
    Ok(Employee::new(
        RowId::new(id),
        EmployeeFields {
            name: get("name")?,
            department: get("department")?,
            level: get("level")?,
            description: get("description")?,
        },
    ))
}

#[async_trait]
impl EmployeeStore for PostgresEmployeeStore {
    type Id = RowId;

    fn backend(&self) -> &'static str {
        "postgres"
    }

    #[instrument(skip(self, fields), err)]
    async fn create(&self, fields: EmployeeFields) -> StoreResult<RowId> {
        bounded(self.timeout, "create", async {
            let mut conn = self.acquire().await?;
            let id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO employees (name, department, level, description)
                VALUES ($1, $2, $3, $4)
                RETURNING id
                "#,
            )
            .bind(fields.name.as_deref())
            .bind(fields.department.as_deref())
            .bind(fields.level.as_deref())
            .bind(fields.description.as_deref())
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("create", e))?;
            Ok(RowId::new(id))
        })
        .await
    }

    #[instrument(skip(self, id), fields(id = %id), err)]
    async fn find_by_id(&self, id: &RowId) -> StoreResult<Employee<RowId>> {
        bounded(self.timeout, "find_by_id", async {
            let mut conn = self.acquire().await?;
            let row = sqlx::query(
                "SELECT id, name, department, level, description FROM employees WHERE id = $1",
            )
            .bind(id.get())
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("find_by_id", e))?;

            match row {
                Some(row) => row_to_employee(&row),
                None => Err(StoreError::NotFound),
            }
        })
        .await
    }

    #[instrument(skip(self), err)]
    async fn find_all(&self) -> StoreResult<Vec<Employee<RowId>>> {
        bounded(self.timeout, "find_all", async {
            let mut conn = self.acquire().await?;
            let rows = sqlx::query(
                "SELECT id, name, department, level, description FROM employees ORDER BY id ASC",
            )
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("find_all", e))?;

            rows.iter().map(row_to_employee).collect()
        })
        .await
    }

    /// Matched and modified counts come from one statement: `target` sees the
    /// row as it was, `changed` only touches it when some value differs.
    #[instrument(skip(self, id, patch), fields(id = %id), err)]
    async fn update_by_id(&self, id: &RowId, patch: EmployeeFields) -> StoreResult<UpdateOutcome> {
        bounded(self.timeout, "update_by_id", async {
            let mut conn = self.acquire().await?;
            let row = sqlx::query(
                r#"
                WITH target AS (
                    SELECT id FROM employees WHERE id = $1
                ), changed AS (
                    UPDATE employees SET
                        name = COALESCE($2, name),
                        department = COALESCE($3, department),
                        level = COALESCE($4, level),
                        description = COALESCE($5, description)
                    WHERE id = $1
                      AND (name, department, level, description) IS DISTINCT FROM
                          (COALESCE($2, name), COALESCE($3, department),
                           COALESCE($4, level), COALESCE($5, description))
                    RETURNING id
                )
                SELECT
                    (SELECT COUNT(*) FROM target) AS matched_count,
                    (SELECT COUNT(*) FROM changed) AS modified_count
                "#,
            )
            .bind(id.get())
            .bind(patch.name.as_deref())
            .bind(patch.department.as_deref())
            .bind(patch.level.as_deref())
            .bind(patch.description.as_deref())
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("update_by_id", e))?;

            let matched: i64 = row
                .try_get("matched_count")
                .map_err(|e| map_sqlx_error("update_by_id", e))?;
            let modified: i64 = row
                .try_get("modified_count")
                .map_err(|e| map_sqlx_error("update_by_id", e))?;

            Ok(UpdateOutcome {
                matched_count: matched.max(0) as u64,
                modified_count: modified.max(0) as u64,
            })
        })
        .await
    }

    #[instrument(skip(self, id), fields(id = %id), err)]
    async fn delete_by_id(&self, id: &RowId) -> StoreResult<u64> {
        bounded(self.timeout, "delete_by_id", async {
            let mut conn = self.acquire().await?;
            let result = sqlx::query("DELETE FROM employees WHERE id = $1")
                .bind(id.get())
                .execute(&mut *conn)
                .await
                .map_err(|e| map_sqlx_error("delete_by_id", e))?;
            Ok(result.rows_affected())
        })
        .await
    }
}
