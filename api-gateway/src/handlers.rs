//! Route handlers. Each validates, consults the store through the planner
//! or codec, and renders the JSON response.

use lambda_http::{Body, Response};
use serde_json::{json, Value};
use shared::codec::{parse_id, ObjectId};
use shared::http::{empty_response, json_response, parse_json_body};
use shared::planner::{plan_conflicts, plan_list};
use shared::time::now_iso8601;
use shared::{
    Deadline, Error, ListQuery, Meeting, MeetingChanges, MeetingDocument, MeetingPatch,
    MeetingStore, NewMeeting, Predicate, Result, SortOrder,
};
use tracing::info;

fn meeting_not_found(id: &str) -> Error {
    Error::NotFound(format!("Meeting {} not found", id))
}

/// Fail with 409 if a `yes` participant of `candidate` is already confirmed
/// for an overlapping meeting.
async fn reject_conflicts(
    store: &dyn MeetingStore,
    deadline: &Deadline,
    candidate: &MeetingDocument,
    exclude: Option<ObjectId>,
) -> Result<()> {
    let Some(predicate) = plan_conflicts(candidate, exclude) else {
        return Ok(());
    };

    let existing = deadline
        .run(store.find_many(&predicate, SortOrder::StartTime))
        .await?;
    if existing.is_empty() {
        return Ok(());
    }

    let mut emails: Vec<String> = Vec::new();
    let conflicts: Vec<Value> = existing
        .iter()
        .map(|meeting| {
            let offending = candidate.confirmed_emails_among(&meeting.confirmed);
            for email in &offending {
                if !emails.contains(email) {
                    emails.push(email.clone());
                }
            }
            json!({
                "id": meeting.id.map(|id| id.to_hex()),
                "emails": offending,
            })
        })
        .collect();

    Err(Error::conflict(
        format!(
            "Already confirmed for an overlapping meeting: {}",
            emails.join(", ")
        ),
        Some(json!({ "conflicts": conflicts })),
    ))
}

async fn find_by_id(
    store: &dyn MeetingStore,
    deadline: &Deadline,
    raw_id: &str,
) -> Result<MeetingDocument> {
    let id = parse_id(raw_id).ok_or_else(|| meeting_not_found(raw_id))?;
    deadline
        .run(store.find_many(&Predicate::by_id(id), SortOrder::StartTime))
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| meeting_not_found(raw_id))
}

/// POST /meetings
pub async fn create_meeting(
    store: &dyn MeetingStore,
    deadline: &Deadline,
    body: &Body,
) -> Result<Response<Body>> {
    let request: NewMeeting = parse_json_body(body)?;
    request.check()?;

    let mut document = MeetingDocument::from_new(request, now_iso8601());
    reject_conflicts(store, deadline, &document, None).await?;

    let id = deadline.run(store.insert_one(document.clone())).await?;
    document.id = Some(id);
    info!("Created meeting {}", id);

    json_response(201, &document.into_meeting()?)
}

/// GET /meetings
pub async fn list_meetings(
    store: &dyn MeetingStore,
    deadline: &Deadline,
    query: &ListQuery,
) -> Result<Response<Body>> {
    let predicate = plan_list(query)?;
    let meetings = deadline
        .run(store.find_many(&predicate, SortOrder::StartTime))
        .await?
        .into_iter()
        .map(MeetingDocument::into_meeting)
        .collect::<Result<Vec<Meeting>>>()?;

    info!("Listed {} meetings", meetings.len());
    json_response(200, &meetings)
}

/// GET /meeting/{id}
pub async fn get_meeting(
    store: &dyn MeetingStore,
    deadline: &Deadline,
    id: &str,
) -> Result<Response<Body>> {
    let meeting = find_by_id(store, deadline, id).await?.into_meeting()?;
    json_response(200, &meeting)
}

/// PUT /meeting/{id}
pub async fn update_meeting(
    store: &dyn MeetingStore,
    deadline: &Deadline,
    id: &str,
    body: &Body,
) -> Result<Response<Body>> {
    let patch: MeetingPatch = parse_json_body(body)?;
    patch.check()?;

    let stored = find_by_id(store, deadline, id).await?;
    if patch.is_empty() {
        return json_response(200, &stored.into_meeting()?);
    }

    let merged = patch.apply_to(&stored.clone().into_meeting()?)?;
    let updated = MeetingDocument::from_meeting(merged)?;
    let object_id = updated.id;
    reject_conflicts(store, deadline, &updated, object_id).await?;

    let changes = MeetingChanges::between(&stored, &updated);
    if !changes.is_empty() {
        let filter = Predicate::by_id(object_id.ok_or_else(|| meeting_not_found(id))?);
        let outcome = deadline.run(store.update_one(&filter, &changes)).await?;
        // Deleted between the read and the write.
        if outcome.matched == 0 {
            return Err(meeting_not_found(id));
        }
        info!("Updated meeting {} ({} modified)", id, outcome.modified);
    }

    json_response(200, &updated.into_meeting()?)
}

/// DELETE /meeting/{id}
pub async fn delete_meeting(
    store: &dyn MeetingStore,
    deadline: &Deadline,
    id: &str,
) -> Result<Response<Body>> {
    let object_id = parse_id(id).ok_or_else(|| meeting_not_found(id))?;
    let deleted = deadline
        .run(store.delete_one(&Predicate::by_id(object_id)))
        .await?;
    if deleted == 0 {
        return Err(meeting_not_found(id));
    }

    info!("Deleted meeting {}", id);
    empty_response(204)
}
