//! Meetings API Lambda.
//!
//! Endpoints:
//! - POST /meetings - Create a meeting
//! - GET /meetings - List meetings (filters: start, end, participant)
//! - GET /meeting/{id} - Get a single meeting
//! - PUT /meeting/{id} - Update a meeting
//! - DELETE /meeting/{id} - Delete a meeting

pub mod handlers;
pub mod router;

pub use router::MeetingsApi;
