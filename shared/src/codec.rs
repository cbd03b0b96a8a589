//! Storage form of a meeting and translation to and from the external model.
//!
//! The stored document keeps every client field verbatim and adds derived
//! fields used by the planner and the unique index:
//! - `_id`: ObjectId, rendered externally as hex
//! - `participants[].email_key`: lower-cased email
//! - `window`: parsed start/end, only when both times parse
//! - `confirmed`: email keys of `yes` participants, omitted when empty

pub use mongodb::bson::oid::ObjectId;
use mongodb::bson::{doc, to_bson, DateTime as BsonDateTime, Document};
use serde::{Deserialize, Serialize};

use crate::models::{email_key, Meeting, NewMeeting, Participant, Rsvp};
use crate::time::TimeWindow;
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantDocument {
    pub name: String,
    pub email: String,
    pub email_key: String,
    pub rsvp: Rsvp,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowDocument {
    pub start: BsonDateTime,
    pub end: BsonDateTime,
}

impl From<TimeWindow> for WindowDocument {
    fn from(window: TimeWindow) -> Self {
        Self {
            start: to_bson_datetime(window.start),
            end: to_bson_datetime(window.end),
        }
    }
}

pub fn to_bson_datetime(dt: chrono::DateTime<chrono::Utc>) -> BsonDateTime {
    BsonDateTime::from_millis(dt.timestamp_millis())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub participants: Vec<ParticipantDocument>,
    pub start_time: String,
    pub end_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<WindowDocument>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub confirmed: Vec<String>,
    pub created_at: String,
}

impl MeetingDocument {
    fn build(
        id: Option<ObjectId>,
        title: String,
        participants: Vec<Participant>,
        start_time: String,
        end_time: String,
        created_at: String,
    ) -> Self {
        let participants: Vec<ParticipantDocument> =
            participants.into_iter().map(ParticipantDocument::from).collect();
        let window = TimeWindow::parse(&start_time, &end_time).map(WindowDocument::from);
        let confirmed = confirmed_keys(&participants);
        Self {
            id,
            title,
            participants,
            start_time,
            end_time,
            window,
            confirmed,
            created_at,
        }
    }

    /// Storage form of a validated create request.
    pub fn from_new(meeting: NewMeeting, created_at: String) -> Self {
        Self::build(
            None,
            meeting.title,
            meeting.participants,
            meeting.start_time,
            meeting.end_time,
            created_at,
        )
    }

    /// Storage form of a full external meeting, e.g. after merging a patch.
    pub fn from_meeting(meeting: Meeting) -> Result<Self> {
        let id = parse_id(&meeting.id)
            .ok_or_else(|| Error::Internal(format!("Malformed meeting id {}", meeting.id)))?;
        Ok(Self::build(
            Some(id),
            meeting.title,
            meeting.participants,
            meeting.start_time,
            meeting.end_time,
            meeting.created_at,
        ))
    }

    /// External form. Fails only for documents that were never inserted.
    pub fn into_meeting(self) -> Result<Meeting> {
        let id = self
            .id
            .ok_or_else(|| Error::Internal("Stored meeting has no _id".to_string()))?;
        Ok(Meeting {
            id: id.to_hex(),
            title: self.title,
            participants: self.participants.into_iter().map(Participant::from).collect(),
            start_time: self.start_time,
            end_time: self.end_time,
            created_at: self.created_at,
        })
    }

    /// Supplied emails of `yes` participants whose key is in `keys`.
    pub fn confirmed_emails_among(&self, keys: &[String]) -> Vec<String> {
        self.participants
            .iter()
            .filter(|p| p.rsvp == Rsvp::Yes && keys.contains(&p.email_key))
            .map(|p| p.email.clone())
            .collect()
    }
}

impl From<Participant> for ParticipantDocument {
    fn from(p: Participant) -> Self {
        Self {
            email_key: email_key(&p.email),
            name: p.name,
            email: p.email,
            rsvp: p.rsvp,
        }
    }
}

impl From<ParticipantDocument> for Participant {
    fn from(p: ParticipantDocument) -> Self {
        Self {
            name: p.name,
            email: p.email,
            rsvp: p.rsvp,
        }
    }
}

fn confirmed_keys(participants: &[ParticipantDocument]) -> Vec<String> {
    let mut keys: Vec<String> = participants
        .iter()
        .filter(|p| p.rsvp == Rsvp::Yes)
        .map(|p| p.email_key.clone())
        .collect();
    keys.sort();
    keys.dedup();
    keys
}

/// Decode an external id. Anything that is not a 24-hex ObjectId matches
/// no meeting.
pub fn parse_id(id: &str) -> Option<ObjectId> {
    ObjectId::parse_str(id).ok()
}

/// Changed fields between a stored document and its replacement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeetingChanges {
    pub title: Option<String>,
    pub participants: Option<Vec<ParticipantDocument>>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub window: Option<Option<WindowDocument>>,
    pub confirmed: Option<Vec<String>>,
}

impl MeetingChanges {
    pub fn between(stored: &MeetingDocument, updated: &MeetingDocument) -> Self {
        fn changed<T: PartialEq + Clone>(old: &T, new: &T) -> Option<T> {
            (old != new).then(|| new.clone())
        }

        Self {
            title: changed(&stored.title, &updated.title),
            participants: changed(&stored.participants, &updated.participants),
            start_time: changed(&stored.start_time, &updated.start_time),
            end_time: changed(&stored.end_time, &updated.end_time),
            window: changed(&stored.window, &updated.window),
            confirmed: changed(&stored.confirmed, &updated.confirmed),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply in place, as the document store would.
    pub fn apply(&self, doc: &mut MeetingDocument) {
        if let Some(title) = &self.title {
            doc.title = title.clone();
        }
        if let Some(participants) = &self.participants {
            doc.participants = participants.clone();
        }
        if let Some(start_time) = &self.start_time {
            doc.start_time = start_time.clone();
        }
        if let Some(end_time) = &self.end_time {
            doc.end_time = end_time.clone();
        }
        if let Some(window) = self.window {
            doc.window = window;
        }
        if let Some(confirmed) = &self.confirmed {
            doc.confirmed = confirmed.clone();
        }
    }

    /// `{$set: ..., $unset: ...}` update document. Derived fields that become
    /// empty are unset so the partial index skips them.
    pub fn to_update_document(&self) -> Result<Document> {
        let mut set = Document::new();
        let mut unset = Document::new();

        if let Some(title) = &self.title {
            set.insert("title", title.as_str());
        }
        if let Some(participants) = &self.participants {
            set.insert("participants", to_bson(participants).map_err(encode_error)?);
        }
        if let Some(start_time) = &self.start_time {
            set.insert("start_time", start_time.as_str());
        }
        if let Some(end_time) = &self.end_time {
            set.insert("end_time", end_time.as_str());
        }
        match &self.window {
            Some(Some(window)) => {
                set.insert("window", doc! { "start": window.start, "end": window.end });
            }
            Some(None) => {
                unset.insert("window", "");
            }
            None => {}
        }
        match &self.confirmed {
            Some(keys) if keys.is_empty() => {
                unset.insert("confirmed", "");
            }
            Some(keys) => {
                set.insert("confirmed", keys.clone());
            }
            None => {}
        }

        let mut update = Document::new();
        if !set.is_empty() {
            update.insert("$set", set);
        }
        if !unset.is_empty() {
            update.insert("$unset", unset);
        }
        Ok(update)
    }
}

fn encode_error(err: mongodb::bson::ser::Error) -> Error {
    Error::Internal(format!("Failed to encode meeting: {}", err))
}
