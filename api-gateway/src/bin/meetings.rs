//! Meetings Lambda - Serves the Meetings API behind API Gateway.

use std::sync::Arc;

use api_gateway::MeetingsApi;
use aws_config::{BehaviorVersion, Region};
use lambda_http::{run, service_fn, Error};
use shared::{db, get_connection_uri, Config, MeetingStore, MemoryStore, StoreBackend, UriSource};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

async fn connection_uri(config: &Config) -> Result<String, Error> {
    match &config.uri {
        Some(UriSource::Env(uri)) => Ok(uri.clone()),
        Some(UriSource::Secret(arn)) => {
            let aws = aws_config::defaults(BehaviorVersion::latest())
                .region(Region::new(config.aws_region.clone()))
                .load()
                .await;
            let secrets_client = aws_sdk_secretsmanager::Client::new(&aws);
            Ok(get_connection_uri(&secrets_client, arn).await?)
        }
        None => Err("MONGODB_URI or MONGODB_URI_SECRET_ARN not set".into()),
    }
}

async fn build_store(config: &Config) -> Result<Arc<dyn MeetingStore>, Error> {
    match config.store {
        StoreBackend::Memory => {
            warn!("Using in-memory meeting store; data is lost when the process exits");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Mongo => {
            let uri = connection_uri(config).await?;
            Ok(Arc::new(db::connect(config, &uri).await?))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let config = Config::from_env()?;
    let store = build_store(&config).await?;
    info!(
        "Meetings API ready (store: {:?}, timeout: {:?})",
        config.store, config.request_timeout
    );

    let api = MeetingsApi::new(store, config.request_timeout);
    run(service_fn(move |event| {
        let api = api.clone();
        async move { api.handle(event).await }
    }))
    .await
}
