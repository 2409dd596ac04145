//!
//! todo-multi storage module
//! --------------------------
//! The store of record sits behind three narrow async traits, one per table:
//! identities (`auth`), sessions (`session`) and tasks (`tasks`). Components hold
//! an `Arc<dyn ...Store>` for the one table they need, injected at startup.
//!
//! Two engines implement all three traits:
//! - `postgres::PgStore`: the durable engine, a deadpool of tokio-postgres clients.
//! - `memory::MemoryStore`: an in-process engine with the same uniqueness rules,
//!   used by tests and `--memory` runs.
//!
//! Engines never hold a lock or transaction across an `.await` that depends on
//! another component; every call is one short statement.

use async_trait::async_trait;

use crate::identity::Session;
use crate::tasks::Task;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Failures raised by storage engines.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique key already exists (duplicate username, token or `(owner, id)`).
    #[error("unique constraint violated: {0}")]
    Conflict(String),
    /// The engine could not be reached (pool exhausted, connection refused).
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Insert a new identity. `Conflict` when the username is taken.
    async fn insert_identity(&self, username: &str, password_hash: &str) -> StoreResult<()>;
    /// Stored password hash for `username`, if the identity exists.
    async fn password_hash(&self, username: &str) -> StoreResult<Option<String>>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert_session(&self, session: &Session) -> StoreResult<()>;
    async fn find_session(&self, token: &str) -> StoreResult<Option<Session>>;
    /// Delete by token, returning the number of rows removed (0 or 1).
    async fn delete_session(&self, token: &str) -> StoreResult<u64>;
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Ids currently used by `owner`, ascending.
    async fn task_ids(&self, owner: &str) -> StoreResult<Vec<i32>>;
    /// Insert a task. `Conflict` when `(owner, task.id)` already exists; never overwrites.
    async fn insert_task(&self, owner: &str, task: &Task) -> StoreResult<()>;
    /// All tasks of `owner`, ascending by id.
    async fn list_tasks(&self, owner: &str) -> StoreResult<Vec<Task>>;
    async fn update_task(&self, owner: &str, id: i32, description: &str) -> StoreResult<u64>;
    async fn delete_task(&self, owner: &str, id: i32) -> StoreResult<u64>;
}
