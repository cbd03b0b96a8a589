//! Request-scoped deadline for store calls.

use std::future::Future;
use std::time::Duration;

use tokio::time::{timeout_at, Instant};

use crate::store::StoreResult;
use crate::{Error, Result};

/// Default budget for a single request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest accepted budget, the Lambda invocation limit.
pub const MAX_REQUEST_TIMEOUT: Duration = Duration::from_secs(900);

/// Fixed point in time after which store calls are abandoned.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
    budget: Duration,
}

impl Deadline {
    /// Deadline `budget` from now, clamped to `MAX_REQUEST_TIMEOUT`.
    pub fn after(budget: Duration) -> Self {
        let budget = budget.min(MAX_REQUEST_TIMEOUT);
        Self {
            at: Instant::now() + budget,
            budget,
        }
    }

    /// Run a store call, aborting it when the deadline fires.
    pub async fn run<T, F>(&self, call: F) -> Result<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        match timeout_at(self.at, call).await {
            Ok(result) => result.map_err(Error::from),
            Err(_) => Err(Error::Timeout(self.budget)),
        }
    }
}
