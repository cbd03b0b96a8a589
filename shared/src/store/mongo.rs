use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::bson::oid::ObjectId;
use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Collection, IndexModel};
use tracing::{debug, info};

use super::{MeetingStore, StoreError, StoreResult, UpdateOutcome};
use crate::codec::{MeetingChanges, MeetingDocument};
use crate::planner::{Predicate, SortOrder};

const DUPLICATE_KEY: i32 = 11000;
const NAMESPACE_NOT_FOUND: i32 = 26;

/// Name of the partial unique index backing the RSVP invariant.
pub const CONFIRMED_START_INDEX: &str = "confirmed_start_time_unique";

/// MongoDB-backed store over a single meetings collection.
#[derive(Debug, Clone)]
pub struct MongoStore {
    collection: Collection<MeetingDocument>,
}

impl MongoStore {
    pub fn new(collection: Collection<MeetingDocument>) -> Self {
        Self { collection }
    }

    /// Create the partial unique index on `(confirmed, start_time)`.
    ///
    /// `confirmed` only exists on meetings with at least one `yes` RSVP, so
    /// meetings without confirmations never collide.
    pub async fn ensure_indexes(&self) -> StoreResult<()> {
        let options = IndexOptions::builder()
            .name(CONFIRMED_START_INDEX.to_string())
            .unique(true)
            .partial_filter_expression(doc! { "confirmed": { "$exists": true } })
            .build();
        let index = IndexModel::builder()
            .keys(doc! { "confirmed": 1, "start_time": 1 })
            .options(options)
            .build();

        self.collection.create_index(index).await.map_err(map_error)?;
        info!("Ensured index {} on {}", CONFIRMED_START_INDEX, self.collection.name());
        Ok(())
    }
}

fn map_error(err: MongoError) -> StoreError {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY => {
            StoreError::Conflict(format!("Duplicate key: {}", write.message))
        }
        ErrorKind::Command(command) if command.code == DUPLICATE_KEY => {
            StoreError::Conflict(format!("Duplicate key: {}", command.message))
        }
        ErrorKind::Command(command) if command.code == NAMESPACE_NOT_FOUND => {
            StoreError::NotFound("Meeting collection".to_string())
        }
        _ => StoreError::Backend(err.to_string()),
    }
}

#[async_trait]
impl MeetingStore for MongoStore {
    async fn insert_one(&self, meeting: MeetingDocument) -> StoreResult<ObjectId> {
        let result = self
            .collection
            .insert_one(&meeting)
            .await
            .map_err(map_error)?;

        result.inserted_id.as_object_id().ok_or_else(|| {
            StoreError::Backend(format!("Unexpected inserted id {}", result.inserted_id))
        })
    }

    async fn find_many(
        &self,
        filter: &Predicate,
        sort: SortOrder,
    ) -> StoreResult<Vec<MeetingDocument>> {
        let filter = filter.to_document();
        debug!("find meetings where {}", filter);

        let mut cursor = self
            .collection
            .find(filter)
            .sort(sort.to_document())
            .await
            .map_err(map_error)?;

        let mut meetings = Vec::new();
        while cursor.advance().await.map_err(map_error)? {
            meetings.push(cursor.deserialize_current().map_err(map_error)?);
        }
        Ok(meetings)
    }

    async fn update_one(
        &self,
        filter: &Predicate,
        changes: &MeetingChanges,
    ) -> StoreResult<UpdateOutcome> {
        let update = changes
            .to_update_document()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let filter = filter.to_document();
        debug!("update meeting where {} with {}", filter, update);

        let result = self
            .collection
            .update_one(filter, update)
            .await
            .map_err(map_error)?;

        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    async fn delete_one(&self, filter: &Predicate) -> StoreResult<u64> {
        let result = self
            .collection
            .delete_one(filter.to_document())
            .await
            .map_err(map_error)?;
        Ok(result.deleted_count)
    }
}
