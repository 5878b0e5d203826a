use std::{future::Future, sync::Arc, time::Duration};

use bson::oid::ObjectId;
use chrono::Utc;
use url::Url;

use crate::{
    database::UrlStore,
    error::{StoreError, URLError},
    models::UrlRecord,
};

/// Validating, time-bounded front for a [`UrlStore`].
#[derive(Clone)]
pub struct StorageGateway {
    store: Arc<dyn UrlStore>,
    timeout: Duration,
}

impl StorageGateway {
    #[must_use]
    pub fn new(store: Arc<dyn UrlStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    #[tracing::instrument(skip(self))]
    pub async fn create(&self, original_url: &str) -> Result<UrlRecord, URLError> {
        let original_url = original_url.trim();
        if !is_web_url(original_url) {
            return Err(URLError::Validation);
        }

        let record = UrlRecord {
            id: ObjectId::new(),
            original_url: original_url.to_string(),
            created_at: Some(Utc::now().into()),
        };
        self.bounded(self.store.insert(&record)).await?;
        tracing::debug!(id = %record.id, "created url record");

        Ok(record)
    }

    #[tracing::instrument(skip(self))]
    pub async fn find_by_id(&self, id: &str) -> Result<UrlRecord, URLError> {
        let id = parse_id(id).ok_or(URLError::InvalidIdentifier)?;

        self.bounded(self.store.find(id))
            .await?
            .ok_or(URLError::NotFound)
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, mongodb::error::Error>>,
    ) -> Result<T, StoreError> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(StoreError::Timeout(self.timeout)),
        }
    }
}

/// Identifiers are `ObjectId`s in their 24-digit hex form.
fn parse_id(id: &str) -> Option<ObjectId> {
    ObjectId::parse_str(id).ok()
}

fn is_web_url(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate
            .parse::<Url>()
            .is_ok_and(|url| matches!(url.scheme(), "https" | "http") && url.has_host())
}
