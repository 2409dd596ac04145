//! Per-owner task namespace: the gap-filling id allocator and the CRUD service
//! built on top of it.

mod allocator;
mod service;

use serde::{Deserialize, Serialize};

pub use allocator::{first_gap, TaskAllocator};
pub use service::{TaskService, DEFAULT_MAX_INSERT_ATTEMPTS};

/// A task as stored and as returned over HTTP (`{"Id": 1, "Desc": "..."}`).
/// The owner is implicit: every task value is read within one owner's scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    #[serde(rename = "Id")]
    pub id: i32,
    #[serde(rename = "Desc")]
    pub description: String,
}
