//! Configuration management for the meetings service.

use std::env;
use std::time::Duration;

use crate::deadline::{DEFAULT_REQUEST_TIMEOUT, MAX_REQUEST_TIMEOUT};
use crate::{Error, Result};

/// Which store backend to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Mongo,
    Memory,
}

/// Where the document store connection URI comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UriSource {
    /// `MONGODB_URI`
    Env(String),
    /// `MONGODB_URI_SECRET_ARN`
    Secret(String),
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Store backend
    pub store: StoreBackend,
    /// Connection URI source, required for the MongoDB backend
    pub uri: Option<UriSource>,
    /// Database name
    pub db_name: String,
    /// Meetings collection name
    pub collection: String,
    /// Per-request deadline
    pub request_timeout: Duration,
    /// AWS region
    pub aws_region: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let store = match lookup("MEETINGS_STORE").as_deref() {
            None | Some("mongodb") => StoreBackend::Mongo,
            Some("memory") => StoreBackend::Memory,
            Some(other) => {
                return Err(Error::Config(format!(
                    "MEETINGS_STORE must be 'mongodb' or 'memory', got '{}'",
                    other
                )))
            }
        };

        let uri = match (lookup("MONGODB_URI"), lookup("MONGODB_URI_SECRET_ARN")) {
            (Some(_), Some(_)) => {
                return Err(Error::Config(
                    "Set only one of MONGODB_URI and MONGODB_URI_SECRET_ARN".to_string(),
                ))
            }
            (Some(uri), None) => Some(UriSource::Env(uri)),
            (None, Some(arn)) => Some(UriSource::Secret(arn)),
            (None, None) => None,
        };
        if store == StoreBackend::Mongo && uri.is_none() {
            return Err(Error::Config(
                "MONGODB_URI or MONGODB_URI_SECRET_ARN not set".to_string(),
            ));
        }

        let request_timeout = match lookup("REQUEST_TIMEOUT_SECS") {
            None => DEFAULT_REQUEST_TIMEOUT,
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 && secs <= MAX_REQUEST_TIMEOUT.as_secs() => {
                    Duration::from_secs(secs)
                }
                _ => {
                    return Err(Error::Config(format!(
                        "REQUEST_TIMEOUT_SECS must be an integer between 1 and {}, got '{}'",
                        MAX_REQUEST_TIMEOUT.as_secs(),
                        raw
                    )))
                }
            },
        };

        Ok(Self {
            store,
            uri,
            db_name: lookup("DATABASE_NAME").unwrap_or_else(|| "schedule".to_string()),
            collection: lookup("MEETINGS_COLLECTION").unwrap_or_else(|| "meeting".to_string()),
            request_timeout,
            aws_region: lookup("AWS_REGION").unwrap_or_else(|| "us-east-1".to_string()),
        })
    }
}
