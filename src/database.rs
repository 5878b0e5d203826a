use std::time::Duration;

use async_trait::async_trait;
use bson::oid::ObjectId;
use mongodb::{
    Client, Collection,
    error::Error,
    options::{ClientOptions, ServerApi, ServerApiVersion},
};

use crate::models::UrlRecord;

const COLLECTION: &str = "urls";

/// Persistence seam under the storage gateway.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UrlStore: Send + Sync {
    async fn insert(&self, record: &UrlRecord) -> Result<(), Error>;

    async fn find(&self, id: ObjectId) -> Result<Option<UrlRecord>, Error>;
}

#[derive(Clone)]
pub struct Database {
    client: Client,
    database: String,
}

impl Database {
    /// Builds the shared client. The driver connects lazily, so this only
    /// fails on a malformed connection string or an unresolvable SRV record.
    pub async fn new(
        connection_string: &str,
        database: &str,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let mut client_options = ClientOptions::parse(connection_string).await?;
        let server_api = ServerApi::builder().version(ServerApiVersion::V1).build();
        client_options.server_api = Some(server_api);
        client_options.connect_timeout = Some(timeout);
        client_options.server_selection_timeout = Some(timeout);
        client_options.app_name.get_or_insert_with(|| env!("CARGO_PKG_NAME").to_string());

        let client = Client::with_options(client_options)?;

        Ok(Self {
            client,
            database: database.to_string(),
        })
    }

    pub async fn ping(&self) -> Result<(), Error> {
        self.client
            .database(&self.database)
            .run_command(bson::doc! { "ping": 1 })
            .await?;

        Ok(())
    }

    fn urls(&self) -> Collection<UrlRecord> {
        self.client
            .database(&self.database)
            .collection::<UrlRecord>(COLLECTION)
    }
}

#[async_trait]
impl UrlStore for Database {
    async fn insert(&self, record: &UrlRecord) -> Result<(), Error> {
        self.urls().insert_one(record).await?;

        Ok(())
    }

    async fn find(&self, id: ObjectId) -> Result<Option<UrlRecord>, Error> {
        let url = self.urls().find_one(bson::doc! { "_id": id }).await?;

        Ok(url)
    }
}
