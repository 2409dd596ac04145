//! PostgreSQL storage engine over a deadpool of tokio-postgres clients.
//! `connect` builds the pool from `DatabaseSettings` and applies
//! `scripts/ddl/schema.sql` before the first request is served.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, PoolError, RecyclingMethod};
use tokio_postgres::error::SqlState;
use tokio_postgres::{NoTls, Row};
use tracing::{debug, info};

use super::{IdentityStore, SessionStore, StoreError, StoreResult, TaskStore};
use crate::config::DatabaseSettings;
use crate::identity::{Owner, Session};
use crate::tasks::Task;

const SCHEMA_SQL: &str = include_str!("../../scripts/ddl/schema.sql");

#[derive(Clone)]
pub struct PgStore {
    pool: Pool,
}

impl From<PoolError> for StoreError {
    fn from(err: PoolError) -> Self { StoreError::Unavailable(err.to_string()) }
}

impl From<tokio_postgres::Error> for StoreError {
    fn from(err: tokio_postgres::Error) -> Self {
        match err.code() {
            Some(code) if *code == SqlState::UNIQUE_VIOLATION => {
                let constraint = err
                    .as_db_error()
                    .and_then(|db| db.constraint())
                    .unwrap_or("unique")
                    .to_string();
                StoreError::Conflict(constraint)
            }
            _ if err.is_closed() => StoreError::Unavailable(err.to_string()),
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

fn column<'a, T: tokio_postgres::types::FromSql<'a>>(row: &'a Row, name: &str) -> StoreResult<T> {
    row.try_get(name).map_err(|e| StoreError::Backend(format!("column {name}: {e}")))
}

impl PgStore {
    /// Build the pool, check connectivity and bring the schema up to date.
    pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<Self> {
        let pg: tokio_postgres::Config = settings.url.parse().context("invalid database url")?;
        let manager = Manager::from_config(pg, NoTls, ManagerConfig { recycling_method: RecyclingMethod::Fast });
        let pool = Pool::builder(manager)
            .max_size(settings.pool_size)
            .build()
            .context("failed to build postgres pool")?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> anyhow::Result<()> {
        let client = self.pool.get().await.context("failed to connect to the database")?;
        client.batch_execute(SCHEMA_SQL).await.context("schema migration failed")?;
        info!(target: "todo::storage", "schema migrations applied");
        Ok(())
    }

    async fn client(&self) -> StoreResult<Object> {
        Ok(self.pool.get().await?)
    }
}

#[async_trait]
impl IdentityStore for PgStore {
    async fn insert_identity(&self, username: &str, password_hash: &str) -> StoreResult<()> {
        let client = self.client().await?;
        client
            .execute("INSERT INTO auth (username, password) VALUES ($1, $2)", &[&username, &password_hash])
            .await?;
        Ok(())
    }

    async fn password_hash(&self, username: &str) -> StoreResult<Option<String>> {
        let client = self.client().await?;
        let row = client
            .query_opt("SELECT password FROM auth WHERE username = $1", &[&username])
            .await?;
        row.map(|r| column::<String>(&r, "password")).transpose()
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn insert_session(&self, session: &Session) -> StoreResult<()> {
        let client = self.client().await?;
        client
            .execute(
                "INSERT INTO session (session_id, username, created_at) VALUES ($1, $2, $3)",
                &[&session.token, &session.owner.as_str(), &session.created_at],
            )
            .await?;
        debug!(target: "todo::storage", owner = %session.owner, "session row inserted");
        Ok(())
    }

    async fn find_session(&self, token: &str) -> StoreResult<Option<Session>> {
        let client = self.client().await?;
        let row = client
            .query_opt("SELECT username, created_at FROM session WHERE session_id = $1", &[&token])
            .await?;
        let Some(row) = row else { return Ok(None) };
        let username: String = column(&row, "username")?;
        let created_at: DateTime<Utc> = column(&row, "created_at")?;
        Ok(Some(Session { token: token.to_string(), owner: Owner::from(username), created_at }))
    }

    async fn delete_session(&self, token: &str) -> StoreResult<u64> {
        let client = self.client().await?;
        Ok(client.execute("DELETE FROM session WHERE session_id = $1", &[&token]).await?)
    }
}

#[async_trait]
impl TaskStore for PgStore {
    async fn task_ids(&self, owner: &str) -> StoreResult<Vec<i32>> {
        let client = self.client().await?;
        let rows = client
            .query("SELECT id FROM tasks WHERE username = $1 ORDER BY id", &[&owner])
            .await?;
        rows.iter().map(|r| column::<i32>(r, "id")).collect()
    }

    async fn insert_task(&self, owner: &str, task: &Task) -> StoreResult<()> {
        let client = self.client().await?;
        client
            .execute(
                "INSERT INTO tasks (username, id, description) VALUES ($1, $2, $3)",
                &[&owner, &task.id, &task.description],
            )
            .await?;
        Ok(())
    }

    async fn list_tasks(&self, owner: &str) -> StoreResult<Vec<Task>> {
        let client = self.client().await?;
        let rows = client
            .query("SELECT id, description FROM tasks WHERE username = $1 ORDER BY id", &[&owner])
            .await?;
        rows.iter()
            .map(|r| Ok(Task { id: column(r, "id")?, description: column(r, "description")? }))
            .collect()
    }

    async fn update_task(&self, owner: &str, id: i32, description: &str) -> StoreResult<u64> {
        let client = self.client().await?;
        Ok(client
            .execute(
                "UPDATE tasks SET description = $3 WHERE username = $1 AND id = $2",
                &[&owner, &id, &description],
            )
            .await?)
    }

    async fn delete_task(&self, owner: &str, id: i32) -> StoreResult<u64> {
        let client = self.client().await?;
        Ok(client
            .execute("DELETE FROM tasks WHERE username = $1 AND id = $2", &[&owner, &id])
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_declares_per_owner_task_key() {
        assert!(SCHEMA_SQL.contains("PRIMARY KEY (username, id)"));
        assert!(SCHEMA_SQL.contains("CREATE TABLE IF NOT EXISTS session"));
        assert!(SCHEMA_SQL.contains("CREATE TABLE IF NOT EXISTS auth"));
    }

    #[test]
    fn malformed_url_is_rejected_before_connecting() {
        let settings = DatabaseSettings { url: "host=localhost port=notaport".into(), ..Default::default() };
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let err = rt.block_on(PgStore::connect(&settings)).err().unwrap();
        assert!(err.to_string().contains("invalid database url"));
    }
}
