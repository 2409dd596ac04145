use std::sync::Arc;

use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::identity::Owner;
use crate::storage::TaskStore;

/// Smallest positive integer missing from `ids`, which must be sorted ascending.
///
/// Returns 1 when 1 is free; otherwise the first `n + 1` after a used `n` that is
/// itself unused, which is one past the maximum when the ids are a dense run.
/// Non-positive and repeated entries are ignored. `None` only when every
/// positive `i32` is taken.
pub fn first_gap(ids: &[i32]) -> Option<i32> {
    let mut candidate: i32 = 1;
    for &id in ids {
        if id < candidate {
            continue;
        }
        if id > candidate {
            break;
        }
        candidate = candidate.checked_add(1)?;
    }
    Some(candidate)
}

/// Computes the id the next task of an owner should get. The read here and the
/// insert that follows are separate store calls; a concurrent insert of the same
/// id is caught by the store's `(owner, id)` key.
pub struct TaskAllocator {
    store: Arc<dyn TaskStore>,
}

impl TaskAllocator {
    pub fn new(store: Arc<dyn TaskStore>) -> Self { Self { store } }

    pub async fn next_id(&self, owner: &Owner) -> AppResult<i32> {
        let ids = self
            .store
            .task_ids(owner.as_str())
            .await
            .map_err(|e| AppError::allocation("id_allocation", e.to_string()))?;
        let id = first_gap(&ids)
            .ok_or_else(|| AppError::allocation("id_space_exhausted", "no task id left for owner"))?;
        debug!(target: "todo::tasks", owner = %owner, used = ids.len(), id, "next task id");
        Ok(id)
    }
}
