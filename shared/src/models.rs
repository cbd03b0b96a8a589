//! External JSON model for meetings.
//!
//! These are the shapes clients send and receive. The storage form lives in
//! [`crate::codec`] and never leaks through here.

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use crate::time::TimeWindow;
use crate::{Error, Result};

/// A participant's stated attendance intent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rsvp {
    Yes,
    No,
    #[default]
    Maybe,
}

/// A named invitee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct Participant {
    #[validate(length(min = 1, message = "participant name must not be empty"))]
    pub name: String,
    #[validate(length(min = 1, message = "participant email must not be empty"))]
    pub email: String,
    #[serde(default)]
    pub rsvp: Rsvp,
}

impl Participant {
    /// Lookup key for case-insensitive email matching.
    pub fn email_key(&self) -> String {
        email_key(&self.email)
    }
}

pub fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Meeting as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meeting {
    pub id: String,
    pub title: String,
    pub participants: Vec<Participant>,
    pub start_time: String,
    pub end_time: String,
    pub created_at: String,
}

/// Create meeting request.
///
/// `id` and `created_at` are tolerated so a client can post back a meeting
/// it previously read; both are discarded.
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct NewMeeting {
    #[serde(default, rename = "id")]
    _id: Option<IgnoredAny>,
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub title: String,
    #[validate(
        length(min = 1, message = "a meeting needs at least one participant"),
        nested
    )]
    pub participants: Vec<Participant>,
    pub start_time: String,
    pub end_time: String,
    #[serde(default, rename = "created_at")]
    _created_at: Option<IgnoredAny>,
}

impl NewMeeting {
    /// Field validation plus the time-ordering rule.
    pub fn check(&self) -> Result<()> {
        self.validate()?;
        check_times(&self.start_time, &self.end_time)
    }
}

/// Update meeting request. Any subset of the mutable fields.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct MeetingPatch {
    #[serde(default, rename = "id", deserialize_with = "present")]
    id: Option<IgnoredAny>,
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub title: Option<String>,
    #[validate(
        length(min = 1, message = "a meeting needs at least one participant"),
        nested
    )]
    pub participants: Option<Vec<Participant>>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    #[serde(default, rename = "created_at", deserialize_with = "present")]
    created_at: Option<IgnoredAny>,
}

/// `Some` whenever the key appears, `null` included.
fn present<'de, D>(deserializer: D) -> std::result::Result<Option<IgnoredAny>, D::Error>
where
    D: Deserializer<'de>,
{
    IgnoredAny::deserialize(deserializer).map(Some)
}

impl MeetingPatch {
    /// Reject attempts to touch immutable fields, then validate what is set.
    pub fn check(&self) -> Result<()> {
        if self.id.is_some() {
            return Err(Error::validation("id is immutable"));
        }
        if self.created_at.is_some() {
            return Err(Error::validation("created_at is immutable"));
        }
        self.validate()?;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.participants.is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
    }

    /// Merge onto a stored meeting and re-check the whole result.
    pub fn apply_to(self, meeting: &Meeting) -> Result<Meeting> {
        let merged = Meeting {
            id: meeting.id.clone(),
            title: self.title.unwrap_or_else(|| meeting.title.clone()),
            participants: self
                .participants
                .unwrap_or_else(|| meeting.participants.clone()),
            start_time: self.start_time.unwrap_or_else(|| meeting.start_time.clone()),
            end_time: self.end_time.unwrap_or_else(|| meeting.end_time.clone()),
            created_at: meeting.created_at.clone(),
        };
        check_times(&merged.start_time, &merged.end_time)?;
        Ok(merged)
    }
}

/// Both times are required; if both parse, start must not be after end.
pub fn check_times(start_time: &str, end_time: &str) -> Result<()> {
    if start_time.trim().is_empty() {
        return Err(Error::validation("start_time must not be empty"));
    }
    if end_time.trim().is_empty() {
        return Err(Error::validation("end_time must not be empty"));
    }
    match TimeWindow::parse(start_time, end_time) {
        Some(window) if !window.is_ordered() => Err(Error::validation(format!(
            "start_time {} is after end_time {}",
            start_time, end_time
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> &'static str {
        r#"{
            "title": "Sync",
            "participants": [{"name": "A", "email": "a@x", "rsvp": "yes"}],
            "start_time": "2024-01-01T09:00Z",
            "end_time": "2024-01-01T10:00Z"
        }"#
    }

    #[test]
    fn test_parse_new_meeting() {
        let meeting: NewMeeting = serde_json::from_str(sample()).unwrap();
        assert_eq!(meeting.title, "Sync");
        assert_eq!(meeting.participants[0].rsvp, Rsvp::Yes);
        assert!(meeting.check().is_ok());
    }

    #[test]
    fn test_rsvp_defaults_to_maybe() {
        let p: Participant = serde_json::from_str(r#"{"name":"B","email":"b@x"}"#).unwrap();
        assert_eq!(p.rsvp, Rsvp::Maybe);
    }

    #[test]
    fn test_unknown_rsvp_rejected() {
        let err = serde_json::from_str::<Participant>(r#"{"name":"B","email":"b@x","rsvp":"sure"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_client_id_and_created_at_ignored_on_create() {
        let body = r#"{
            "id": "abc", "created_at": "yesterday", "title": "Sync",
            "participants": [{"name": "A", "email": "a@x"}],
            "start_time": "9", "end_time": "10"
        }"#;
        let meeting: NewMeeting = serde_json::from_str(body).unwrap();
        assert!(meeting.check().is_ok());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let body = sample().replacen("\"title\"", "\"room\": \"4B\", \"title\"", 1);
        assert!(serde_json::from_str::<NewMeeting>(&body).is_err());

        let nested = sample().replacen("\"rsvp\"", "\"phone\": \"555\", \"rsvp\"", 1);
        assert!(serde_json::from_str::<NewMeeting>(&nested).is_err());
    }

    #[test]
    fn test_validation_failures() {
        let mut meeting: NewMeeting = serde_json::from_str(sample()).unwrap();
        meeting.title.clear();
        assert_eq!(meeting.check().unwrap_err().kind(), "validation");

        let mut meeting: NewMeeting = serde_json::from_str(sample()).unwrap();
        meeting.participants.clear();
        assert_eq!(meeting.check().unwrap_err().kind(), "validation");

        let mut meeting: NewMeeting = serde_json::from_str(sample()).unwrap();
        meeting.participants[0].email.clear();
        assert_eq!(meeting.check().unwrap_err().kind(), "validation");

        let mut meeting: NewMeeting = serde_json::from_str(sample()).unwrap();
        meeting.start_time = "2024-01-01T11:00Z".into();
        assert_eq!(meeting.check().unwrap_err().kind(), "validation");
    }

    #[test]
    fn test_missing_time_is_a_parse_error() {
        let body = sample().replace("\"end_time\": \"2024-01-01T10:00Z\"", "\"end_time\": null");
        assert!(serde_json::from_str::<NewMeeting>(&body).is_err());
    }

    #[test]
    fn test_unparseable_times_are_not_ordered() {
        assert!(check_times("5: 00", "2: 00").is_ok());
        assert!(check_times("2024-01-01T11:00Z", "2: 00").is_ok());
    }

    #[test]
    fn test_patch_rejects_immutable_fields() {
        let patch: MeetingPatch = serde_json::from_str(r#"{"id":"x"}"#).unwrap();
        assert!(patch.check().is_err());
        let patch: MeetingPatch = serde_json::from_str(r#"{"created_at":"x"}"#).unwrap();
        assert!(patch.check().is_err());
        let patch: MeetingPatch = serde_json::from_str(r#"{"id":null}"#).unwrap();
        assert!(patch.check().is_err());
        let patch: MeetingPatch = serde_json::from_str(r#"{"created_at":null}"#).unwrap();
        assert!(patch.check().is_err());
        let patch: MeetingPatch = serde_json::from_str(r#"{"title":null}"#).unwrap();
        assert!(patch.check().is_ok() && patch.is_empty());
        assert!(serde_json::from_str::<MeetingPatch>(r#"{"room":"x"}"#).is_err());
    }

    #[test]
    fn test_patch_merge_keeps_unset_fields() {
        let stored = Meeting {
            id: "1".into(),
            title: "Sync".into(),
            participants: vec![Participant {
                name: "A".into(),
                email: "a@x".into(),
                rsvp: Rsvp::Yes,
            }],
            start_time: "2024-01-01T09:00Z".into(),
            end_time: "2024-01-01T10:00Z".into(),
            created_at: "2024-01-01T00:00:00Z".into(),
        };
        let patch: MeetingPatch = serde_json::from_str(r#"{"title":"Standup"}"#).unwrap();
        patch.check().unwrap();
        let merged = patch.apply_to(&stored).unwrap();
        assert_eq!(merged.title, "Standup");
        assert_eq!(merged.participants, stored.participants);
        assert_eq!(merged.created_at, stored.created_at);

        let patch: MeetingPatch =
            serde_json::from_str(r#"{"end_time":"2024-01-01T08:00Z"}"#).unwrap();
        assert!(patch.apply_to(&stored).is_err());
    }

    #[test]
    fn test_email_key_is_case_insensitive() {
        assert_eq!(email_key(" A@X "), "a@x");
    }
}
