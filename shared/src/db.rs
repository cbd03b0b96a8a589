//! Document store connection management.

use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use mongodb::Client;
use std::time::Duration;
use tracing::info;

use crate::codec::MeetingDocument;
use crate::store::MongoStore;
use crate::{Config, Error, Result};

/// Connect to MongoDB, verify the deployment answers, and ensure indexes.
pub async fn connect(config: &Config, uri: &str) -> Result<MongoStore> {
    let mut options = ClientOptions::parse(uri)
        .await
        .map_err(|e| Error::Config(format!("Invalid MongoDB URI: {}", e)))?;
    options.app_name = Some("meetings-api".to_string());
    options.max_pool_size = Some(5);
    options.server_selection_timeout = Some(Duration::from_secs(3));

    let client = Client::with_options(options)
        .map_err(|e| Error::Backend(format!("Failed to create MongoDB client: {}", e)))?;

    let database = client.database(&config.db_name);
    database
        .run_command(doc! { "ping": 1 })
        .await
        .map_err(|e| Error::Backend(format!("Failed to connect to database: {}", e)))?;
    info!("Connected to database {}", config.db_name);

    let store = MongoStore::new(database.collection::<MeetingDocument>(&config.collection));
    store.ensure_indexes().await?;
    Ok(store)
}
