//! Shared library for the Meetings API.
//!
//! Model and storage codec, query planner, store backends, configuration,
//! and the HTTP error reporter used by the API Lambda.

pub mod codec;
pub mod config;
pub mod db;
pub mod deadline;
pub mod error;
pub mod http;
pub mod models;
pub mod planner;
pub mod secrets;
pub mod store;
pub mod time;

pub use codec::{MeetingChanges, MeetingDocument};
pub use config::{Config, StoreBackend, UriSource};
pub use deadline::Deadline;
pub use error::{Error, Result};
pub use models::{Meeting, MeetingPatch, NewMeeting, Participant, Rsvp};
pub use planner::{ListQuery, Predicate, SortOrder};
pub use secrets::{get_connection_uri, get_secret};
pub use store::{MeetingStore, MemoryStore, MongoStore, StoreError};
