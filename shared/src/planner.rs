//! Query planner: external filter parameters to storage-level predicates.
//!
//! A [`Predicate`] is an AND of [`Clause`]s. It renders to a MongoDB filter
//! document and can also be evaluated directly against a stored document;
//! the two interpretations agree. Planning is pure.

use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{doc, Bson, DateTime as BsonDateTime, Document};

use crate::codec::{to_bson_datetime, MeetingDocument};
use crate::models::email_key;
use crate::time::{parse_timestamp, TimeWindow};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// `_id == id`
    IdEq(ObjectId),
    /// `_id != id`
    IdNe(ObjectId),
    /// `window.start <= t`
    StartsAtOrBefore(BsonDateTime),
    /// `window.end >= t`
    EndsAtOrAfter(BsonDateTime),
    /// `participants.email_key == key`
    Participant(String),
    /// `confirmed` shares an element with `keys`
    ConfirmedAny(Vec<String>),
    /// `start_time == raw`
    StartTimeEq(String),
    /// at least one branch matches
    AnyOf(Vec<Predicate>),
}

impl Clause {
    fn field(&self) -> &'static str {
        match self {
            Clause::IdEq(_) | Clause::IdNe(_) => "_id",
            Clause::StartsAtOrBefore(_) => "window.start",
            Clause::EndsAtOrAfter(_) => "window.end",
            Clause::Participant(_) => "participants.email_key",
            Clause::ConfirmedAny(_) => "confirmed",
            Clause::StartTimeEq(_) => "start_time",
            Clause::AnyOf(_) => "$or",
        }
    }

    fn condition(&self) -> Bson {
        match self {
            Clause::IdEq(id) => Bson::ObjectId(*id),
            Clause::IdNe(id) => Bson::Document(doc! { "$ne": *id }),
            Clause::StartsAtOrBefore(t) => Bson::Document(doc! { "$lte": *t }),
            Clause::EndsAtOrAfter(t) => Bson::Document(doc! { "$gte": *t }),
            Clause::Participant(key) => Bson::String(key.clone()),
            Clause::ConfirmedAny(keys) => Bson::Document(doc! { "$in": keys.clone() }),
            Clause::StartTimeEq(raw) => Bson::String(raw.clone()),
            Clause::AnyOf(branches) => Bson::Array(
                branches
                    .iter()
                    .map(|p| Bson::Document(p.to_document()))
                    .collect(),
            ),
        }
    }

    fn matches(&self, meeting: &MeetingDocument) -> bool {
        match self {
            Clause::IdEq(id) => meeting.id.as_ref() == Some(id),
            Clause::IdNe(id) => meeting.id.as_ref() != Some(id),
            Clause::StartsAtOrBefore(t) => meeting
                .window
                .is_some_and(|w| w.start.timestamp_millis() <= t.timestamp_millis()),
            Clause::EndsAtOrAfter(t) => meeting
                .window
                .is_some_and(|w| w.end.timestamp_millis() >= t.timestamp_millis()),
            Clause::Participant(key) => meeting.participants.iter().any(|p| &p.email_key == key),
            Clause::ConfirmedAny(keys) => meeting.confirmed.iter().any(|k| keys.contains(k)),
            Clause::StartTimeEq(raw) => &meeting.start_time == raw,
            Clause::AnyOf(branches) => branches.iter().any(|p| p.matches(meeting)),
        }
    }
}

/// AND of clauses. The empty predicate matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    clauses: Vec<Clause>,
}

impl Predicate {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_id(id: ObjectId) -> Self {
        Self {
            clauses: vec![Clause::IdEq(id)],
        }
    }

    pub fn and(mut self, clause: Clause) -> Self {
        self.clauses.push(clause);
        self
    }

    pub fn matches(&self, meeting: &MeetingDocument) -> bool {
        self.clauses.iter().all(|c| c.matches(meeting))
    }

    /// MongoDB filter document. Clauses on distinct fields share one flat
    /// document; a repeated field falls back to `$and`.
    pub fn to_document(&self) -> Document {
        let mut flat = Document::new();
        for clause in &self.clauses {
            if flat.contains_key(clause.field()) {
                let parts: Vec<Document> = self
                    .clauses
                    .iter()
                    .map(|c| {
                        let mut part = Document::new();
                        part.insert(c.field(), c.condition());
                        part
                    })
                    .collect();
                return doc! { "$and": parts };
            }
            flat.insert(clause.field(), clause.condition());
        }
        flat
    }
}

/// Result ordering for `find_many`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// `start_time` ascending, ties by id ascending.
    ///
    /// Compares the raw strings byte-wise, as MongoDB does, so mixed
    /// precision or offsets do not sort in chronological order.
    #[default]
    StartTime,
}

impl SortOrder {
    pub fn to_document(self) -> Document {
        match self {
            SortOrder::StartTime => doc! { "start_time": 1, "_id": 1 },
        }
    }

    pub fn sort(self, meetings: &mut [MeetingDocument]) {
        match self {
            SortOrder::StartTime => {
                meetings.sort_by(|a, b| a.start_time.cmp(&b.start_time).then(a.id.cmp(&b.id)))
            }
        }
    }
}

/// Filter parameters accepted by `GET /meetings`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub start: Option<String>,
    pub end: Option<String>,
    pub participant: Option<String>,
}

impl ListQuery {
    /// Collect query-string pairs, rejecting unknown or repeated parameters.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<Self> {
        let mut query = Self::default();
        for (key, value) in pairs {
            let slot = match key {
                "start" => &mut query.start,
                "end" => &mut query.end,
                "participant" => &mut query.participant,
                other => {
                    return Err(Error::validation(format!(
                        "Unknown query parameter '{}'. Must be one of: start, end, participant",
                        other
                    )))
                }
            };
            if slot.replace(value.to_string()).is_some() {
                return Err(Error::validation(format!(
                    "Query parameter '{}' given more than once",
                    key
                )));
            }
        }
        Ok(query)
    }
}

fn parse_bound(name: &str, value: &str) -> Result<DateTime<Utc>> {
    parse_timestamp(value).ok_or_else(|| {
        Error::validation(format!(
            "Query parameter '{}' is not an ISO-8601 date-time: {}",
            name, value
        ))
    })
}

/// Plan the predicate for a list query.
///
/// A meeting matches the window iff `start_time <= end AND end_time >= start`;
/// a missing bound drops its clause.
pub fn plan_list(query: &ListQuery) -> Result<Predicate> {
    let start = query
        .start
        .as_deref()
        .map(|v| parse_bound("start", v))
        .transpose()?;
    let end = query
        .end
        .as_deref()
        .map(|v| parse_bound("end", v))
        .transpose()?;

    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(Error::validation("Query parameter 'start' is after 'end'"));
        }
    }

    let mut predicate = Predicate::all();
    if let Some(end) = end {
        predicate = predicate.and(Clause::StartsAtOrBefore(to_bson_datetime(end)));
    }
    if let Some(start) = start {
        predicate = predicate.and(Clause::EndsAtOrAfter(to_bson_datetime(start)));
    }
    if let Some(participant) = &query.participant {
        let key = email_key(participant);
        if key.is_empty() {
            return Err(Error::validation("Query parameter 'participant' must not be empty"));
        }
        predicate = predicate.and(Clause::Participant(key));
    }
    Ok(predicate)
}

/// Plan the RSVP conflict query for a candidate meeting.
///
/// Returns `None` when nobody on the candidate has RSVP'd yes. Candidates
/// whose times do not parse can only collide on an identical `start_time`.
/// An identical `start_time` always collides, even when the existing
/// meeting has no parsed window.
pub fn plan_conflicts(candidate: &MeetingDocument, exclude: Option<ObjectId>) -> Option<Predicate> {
    if candidate.confirmed.is_empty() {
        return None;
    }

    let mut predicate = Predicate::all().and(Clause::ConfirmedAny(candidate.confirmed.clone()));
    match TimeWindow::parse(&candidate.start_time, &candidate.end_time) {
        Some(window) => {
            let overlap = Predicate::all()
                .and(Clause::StartsAtOrBefore(to_bson_datetime(window.end)))
                .and(Clause::EndsAtOrAfter(to_bson_datetime(window.start)));
            let same_start = Predicate::all().and(Clause::StartTimeEq(candidate.start_time.clone()));
            predicate = predicate.and(Clause::AnyOf(vec![overlap, same_start]));
        }
        None => {
            predicate = predicate.and(Clause::StartTimeEq(candidate.start_time.clone()));
        }
    }
    if let Some(id) = exclude {
        predicate = predicate.and(Clause::IdNe(id));
    }
    Some(predicate)
}
