use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use tracing::debug;

use super::{violates_unique_index, MeetingStore, StoreError, StoreResult, UpdateOutcome};
use crate::codec::{MeetingChanges, MeetingDocument};
use crate::planner::{Predicate, SortOrder};

/// Process-local store. Cloning shares the same collection.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    meetings: Arc<Mutex<Vec<MeetingDocument>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Vec<MeetingDocument>>> {
        self.meetings
            .lock()
            .map_err(|_| StoreError::Backend("Meeting collection lock poisoned".to_string()))
    }

    pub fn len(&self) -> usize {
        self.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn duplicate_key(meeting: &MeetingDocument) -> StoreError {
    StoreError::Conflict(format!(
        "Duplicate key: a confirmed participant already has a meeting starting at {}",
        meeting.start_time
    ))
}

#[async_trait]
impl MeetingStore for MemoryStore {
    async fn insert_one(&self, mut meeting: MeetingDocument) -> StoreResult<ObjectId> {
        let mut meetings = self.lock()?;
        if meetings.iter().any(|m| violates_unique_index(m, &meeting)) {
            return Err(duplicate_key(&meeting));
        }

        let id = ObjectId::new();
        meeting.id = Some(id);
        meetings.push(meeting);
        debug!("Inserted meeting {} ({} stored)", id, meetings.len());
        Ok(id)
    }

    async fn find_many(
        &self,
        filter: &Predicate,
        sort: SortOrder,
    ) -> StoreResult<Vec<MeetingDocument>> {
        let mut found: Vec<MeetingDocument> = self
            .lock()?
            .iter()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect();
        sort.sort(&mut found);
        Ok(found)
    }

    async fn update_one(
        &self,
        filter: &Predicate,
        changes: &MeetingChanges,
    ) -> StoreResult<UpdateOutcome> {
        let mut meetings = self.lock()?;
        let Some(index) = meetings.iter().position(|m| filter.matches(m)) else {
            return Ok(UpdateOutcome::default());
        };

        let mut updated = meetings[index].clone();
        changes.apply(&mut updated);
        let collides = meetings
            .iter()
            .enumerate()
            .any(|(i, m)| i != index && violates_unique_index(m, &updated));
        if collides {
            return Err(duplicate_key(&updated));
        }

        let modified = u64::from(meetings[index] != updated);
        meetings[index] = updated;
        Ok(UpdateOutcome {
            matched: 1,
            modified,
        })
    }

    async fn delete_one(&self, filter: &Predicate) -> StoreResult<u64> {
        let mut meetings = self.lock()?;
        match meetings.iter().position(|m| filter.matches(m)) {
            Some(index) => {
                meetings.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }
}
