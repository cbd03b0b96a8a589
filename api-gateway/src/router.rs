//! Path/method dispatch and the per-request lifecycle.

use std::sync::Arc;
use std::time::Duration;

use lambda_http::{Body, Request, RequestExt, Response};
use shared::http::error_response;
use shared::{Deadline, Error, ListQuery, MeetingStore, Result};
use tracing::info;

use crate::handlers;

/// Application state shared by every invocation.
#[derive(Clone)]
pub struct MeetingsApi {
    store: Arc<dyn MeetingStore>,
    request_timeout: Duration,
}

impl MeetingsApi {
    pub fn new(store: Arc<dyn MeetingStore>, request_timeout: Duration) -> Self {
        Self {
            store,
            request_timeout,
        }
    }

    /// Serve one request. Every failure is funneled through the error
    /// reporter; only a failure to build the error response itself escapes.
    pub async fn handle(&self, event: Request) -> std::result::Result<Response<Body>, lambda_http::Error> {
        let deadline = Deadline::after(self.request_timeout);
        match self.dispatch(&event, &deadline).await {
            Ok(response) => Ok(response),
            Err(err) => error_response(&err),
        }
    }

    async fn dispatch(&self, event: &Request, deadline: &Deadline) -> Result<Response<Body>> {
        let method = event.method().as_str();
        let raw_path = event.uri().path();
        // Strip /api stage prefix if present (API Gateway REST API includes stage in path)
        let path = raw_path.strip_prefix("/api").unwrap_or(raw_path);

        info!("Meetings request: {} {}", method, path);

        let store = self.store.as_ref();
        match (method, path) {
            ("POST", "/meetings") => {
                require_json(event)?;
                handlers::create_meeting(store, deadline, event.body()).await
            }
            ("GET", "/meetings") => {
                let params = event.query_string_parameters();
                let query = ListQuery::from_pairs(params.iter())?;
                handlers::list_meetings(store, deadline, &query).await
            }
            (_, "/meetings") => Err(Error::MethodNotAllowed(method.to_string())),

            _ if path.starts_with("/meeting/") => {
                let id = path.trim_start_matches("/meeting/");
                if id.is_empty() || id.contains('/') {
                    return Err(Error::NotFound(format!("No route for {}", path)));
                }
                match method {
                    "GET" => handlers::get_meeting(store, deadline, id).await,
                    "PUT" => {
                        require_json(event)?;
                        handlers::update_meeting(store, deadline, id, event.body()).await
                    }
                    "DELETE" => handlers::delete_meeting(store, deadline, id).await,
                    _ => Err(Error::MethodNotAllowed(method.to_string())),
                }
            }

            _ => Err(Error::NotFound(format!("No route for {}", path))),
        }
    }
}

/// Bodies must be JSON. A missing content-type is tolerated.
fn require_json(event: &Request) -> Result<()> {
    let Some(value) = event.headers().get("content-type") else {
        return Ok(());
    };
    let content_type = value.to_str().unwrap_or_default().to_ascii_lowercase();
    if content_type.starts_with("application/json") {
        Ok(())
    } else {
        Err(Error::validation(format!(
            "Unsupported content-type '{}'. Must be application/json",
            content_type
        )))
    }
}
