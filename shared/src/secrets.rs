//! AWS Secrets Manager integration.

use aws_sdk_secretsmanager::Client as SecretsClient;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;
use tokio::sync::RwLock;

use crate::{Error, Result};

/// Cached secrets with lazy initialization.
static SECRETS_CACHE: OnceLock<RwLock<HashMap<String, String>>> = OnceLock::new();

fn get_cache() -> &'static RwLock<HashMap<String, String>> {
    SECRETS_CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Connection secret stored as JSON.
#[derive(Debug, Deserialize)]
struct ConnectionSecret {
    uri: String,
}

/// Get a secret value from Secrets Manager with caching.
pub async fn get_secret(client: &SecretsClient, secret_arn: &str) -> Result<String> {
    // Check cache first
    {
        let cache = get_cache().read().await;
        if let Some(value) = cache.get(secret_arn) {
            return Ok(value.clone());
        }
    }

    let response = client
        .get_secret_value()
        .secret_id(secret_arn)
        .send()
        .await
        .map_err(|e| Error::Aws(format!("Failed to get secret: {}", e)))?;

    let secret_string = response
        .secret_string()
        .ok_or_else(|| Error::Aws("Secret has no string value".to_string()))?
        .to_string();

    {
        let mut cache = get_cache().write().await;
        cache.insert(secret_arn.to_string(), secret_string.clone());
    }

    Ok(secret_string)
}

/// Get the document store connection URI from Secrets Manager.
pub async fn get_connection_uri(client: &SecretsClient, secret_arn: &str) -> Result<String> {
    let secret_string = get_secret(client, secret_arn).await?;
    parse_connection_uri(&secret_string)
}

/// Accepts a bare URI or `{"uri": "..."}`.
fn parse_connection_uri(secret: &str) -> Result<String> {
    let secret = secret.trim();
    if secret.starts_with('{') {
        let parsed: ConnectionSecret = serde_json::from_str(secret)
            .map_err(|e| Error::Aws(format!("Failed to parse connection secret: {}", e)))?;
        return Ok(parsed.uri);
    }
    if secret.is_empty() {
        return Err(Error::Aws("Connection secret is empty".to_string()));
    }
    Ok(secret.to_string())
}
