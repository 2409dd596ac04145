//! In-process storage engine. Same key rules as the PostgreSQL schema:
//! username unique, token unique, `(owner, id)` unique.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{IdentityStore, SessionStore, StoreError, StoreResult, TaskStore};
use crate::identity::Session;
use crate::tasks::Task;

#[derive(Debug, Default)]
struct Tables {
    /// username -> password hash
    auth: HashMap<String, String>,
    /// token -> session
    session: HashMap<String, Session>,
    /// (owner, id) -> description
    tasks: BTreeMap<(String, i32), String>,
}

/// Memory engine. Cloning shares the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore(Arc<Mutex<Tables>>);

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    /// Number of live sessions, across all owners.
    pub fn session_count(&self) -> usize { self.0.lock().session.len() }
}

fn owner_range(owner: &str) -> std::ops::RangeInclusive<(String, i32)> {
    (owner.to_string(), i32::MIN)..=(owner.to_string(), i32::MAX)
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn insert_identity(&self, username: &str, password_hash: &str) -> StoreResult<()> {
        let mut tables = self.0.lock();
        if tables.auth.contains_key(username) {
            return Err(StoreError::Conflict(format!("auth.username={username}")));
        }
        tables.auth.insert(username.to_string(), password_hash.to_string());
        Ok(())
    }

    async fn password_hash(&self, username: &str) -> StoreResult<Option<String>> {
        Ok(self.0.lock().auth.get(username).cloned())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn insert_session(&self, session: &Session) -> StoreResult<()> {
        let mut tables = self.0.lock();
        if tables.session.contains_key(&session.token) {
            return Err(StoreError::Conflict("session.session_id".into()));
        }
        tables.session.insert(session.token.clone(), session.clone());
        Ok(())
    }

    async fn find_session(&self, token: &str) -> StoreResult<Option<Session>> {
        Ok(self.0.lock().session.get(token).cloned())
    }

    async fn delete_session(&self, token: &str) -> StoreResult<u64> {
        Ok(self.0.lock().session.remove(token).map_or(0, |_| 1))
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn task_ids(&self, owner: &str) -> StoreResult<Vec<i32>> {
        let tables = self.0.lock();
        Ok(tables.tasks.range(owner_range(owner)).map(|((_, id), _)| *id).collect())
    }

    async fn insert_task(&self, owner: &str, task: &Task) -> StoreResult<()> {
        let mut tables = self.0.lock();
        let key = (owner.to_string(), task.id);
        if tables.tasks.contains_key(&key) {
            return Err(StoreError::Conflict(format!("tasks({owner}, {})", task.id)));
        }
        tables.tasks.insert(key, task.description.clone());
        Ok(())
    }

    async fn list_tasks(&self, owner: &str) -> StoreResult<Vec<Task>> {
        let tables = self.0.lock();
        Ok(tables
            .tasks
            .range(owner_range(owner))
            .map(|((_, id), description)| Task { id: *id, description: description.clone() })
            .collect())
    }

    async fn update_task(&self, owner: &str, id: i32, description: &str) -> StoreResult<u64> {
        let mut tables = self.0.lock();
        match tables.tasks.get_mut(&(owner.to_string(), id)) {
            Some(existing) => {
                *existing = description.to_string();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_task(&self, owner: &str, id: i32) -> StoreResult<u64> {
        Ok(self.0.lock().tasks.remove(&(owner.to_string(), id)).map_or(0, |_| 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Owner;
    use chrono::Utc;

    fn task(id: i32, description: &str) -> Task {
        Task { id, description: description.to_string() }
    }

    #[tokio::test]
    async fn duplicate_username_is_conflict() {
        let store = MemoryStore::new();
        store.insert_identity("alice", "h1").await.unwrap();
        let err = store.insert_identity("alice", "h2").await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.password_hash("alice").await.unwrap().as_deref(), Some("h1"));
    }

    #[tokio::test]
    async fn duplicate_task_id_is_conflict_not_overwrite() {
        let store = MemoryStore::new();
        store.insert_task("alice", &task(1, "buy milk")).await.unwrap();
        let err = store.insert_task("alice", &task(1, "call bob")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.list_tasks("alice").await.unwrap(), vec![task(1, "buy milk")]);
        // same id, other owner: independent namespace
        store.insert_task("bob", &task(1, "call alice")).await.unwrap();
    }

    #[tokio::test]
    async fn ids_and_listing_are_scoped_and_ascending() {
        let store = MemoryStore::new();
        for id in [4, 1, 2] {
            store.insert_task("alice", &task(id, "x")).await.unwrap();
        }
        store.insert_task("alicia", &task(3, "y")).await.unwrap();
        assert_eq!(store.task_ids("alice").await.unwrap(), vec![1, 2, 4]);
        assert_eq!(store.task_ids("nobody").await.unwrap(), Vec::<i32>::new());
        let ids: Vec<i32> = store.list_tasks("alicia").await.unwrap().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![3]);
    }

    #[tokio::test]
    async fn update_and_delete_report_rows_affected() {
        let store = MemoryStore::new();
        store.insert_task("alice", &task(1, "old")).await.unwrap();
        assert_eq!(store.update_task("alice", 1, "new").await.unwrap(), 1);
        assert_eq!(store.update_task("bob", 1, "hijack").await.unwrap(), 0);
        assert_eq!(store.delete_task("bob", 1).await.unwrap(), 0);
        assert_eq!(store.delete_task("alice", 1).await.unwrap(), 1);
        assert_eq!(store.delete_task("alice", 1).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn session_delete_is_idempotent() {
        let store = MemoryStore::new();
        let session = Session { token: "t".into(), owner: Owner::from("alice"), created_at: Utc::now() };
        store.insert_session(&session).await.unwrap();
        assert_eq!(store.find_session("t").await.unwrap(), Some(session));
        assert_eq!(store.delete_session("t").await.unwrap(), 1);
        assert_eq!(store.delete_session("t").await.unwrap(), 0);
        assert_eq!(store.session_count(), 0);
    }
}
