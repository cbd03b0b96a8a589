//! Document store abstraction for meetings.
//!
//! Two backends implement [`MeetingStore`]: [`MongoStore`] for deployments
//! and [`MemoryStore`] for local runs and tests. Both enforce the partial
//! unique index on `(confirmed email, start_time)`.

mod memory;
mod mongo;

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use thiserror::Error;

use crate::codec::{MeetingChanges, MeetingDocument};
use crate::planner::{Predicate, SortOrder};

pub use memory::MemoryStore;
pub use mongo::{MongoStore, CONFIRMED_START_INDEX};

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Storage failures, as surfaced to handlers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    /// Unique-index violation
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Backend(String),
}

/// Counts reported by `update_one`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub modified: u64,
}

#[async_trait]
pub trait MeetingStore: Send + Sync {
    /// Insert a new meeting, returning its assigned id.
    async fn insert_one(&self, meeting: MeetingDocument) -> StoreResult<ObjectId>;

    async fn find_many(
        &self,
        filter: &Predicate,
        sort: SortOrder,
    ) -> StoreResult<Vec<MeetingDocument>>;

    /// Apply `changes` to the first meeting matching `filter`.
    async fn update_one(
        &self,
        filter: &Predicate,
        changes: &MeetingChanges,
    ) -> StoreResult<UpdateOutcome>;

    /// Delete the first meeting matching `filter`, returning the deleted count.
    async fn delete_one(&self, filter: &Predicate) -> StoreResult<u64>;
}

/// Would `a` and `b` collide on the partial unique index?
pub(crate) fn violates_unique_index(a: &MeetingDocument, b: &MeetingDocument) -> bool {
    a.start_time == b.start_time && a.confirmed.iter().any(|k| b.confirmed.contains(k))
}
