use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::bson::{Bson, Document};
use mongodb::options::{FindOptions, UpdateOptions};
use mongodb::{Client, Database};

use crate::config::StoreConfig;
use crate::error::{PowercheckError, Result};
use crate::query::FindSettings;

use super::{DocumentStore, FindResult, internalize_id_filter, strip_update_identity};

/// Gateway over one shared MongoDB client. Constructed once at startup by the
/// composition root and shared by every request; connection pooling belongs
/// to the driver.
#[derive(Debug, Clone)]
pub struct MongoStore {
    database: Database,
}

impl MongoStore {
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let client = Client::with_uri_str(&config.connection_uri).await.map_err(|err| {
            tracing::error!(%err, "failed to initialize document store client");
            PowercheckError::StoreUnavailable(err.to_string())
        })?;
        Ok(Self {
            database: client.database(&config.database),
        })
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn find(
        &self,
        filter: Document,
        collection: &str,
        options: FindSettings,
    ) -> Result<FindResult> {
        let filter = internalize_id_filter(filter)?;
        let handle = self.database.collection::<Document>(collection);

        let total = handle
            .count_documents(filter.clone(), None)
            .await
            .map_err(|err| store_error("count", collection, &err))?;

        let find_options = FindOptions::builder()
            .sort(options.sort)
            .skip(options.skip)
            .limit(options.limit)
            .projection(options.projection)
            .build();
        let documents = handle
            .find(filter, find_options)
            .await
            .map_err(|err| store_error("find", collection, &err))?
            .try_collect()
            .await
            .map_err(|err| store_error("find", collection, &err))?;

        Ok(FindResult { documents, total })
    }

    async fn aggregate(&self, stages: Vec<Document>, collection: &str) -> Result<FindResult> {
        let handle = self.database.collection::<Document>(collection);
        let documents: Vec<Document> = handle
            .aggregate(stages, None)
            .await
            .map_err(|err| store_error("aggregate", collection, &err))?
            .try_collect()
            .await
            .map_err(|err| store_error("aggregate", collection, &err))?;
        let total = documents.len() as u64;

        Ok(FindResult { documents, total })
    }

    async fn upsert(
        &self,
        filter: Document,
        mut update: Document,
        collection: &str,
    ) -> Result<Option<String>> {
        let filter = internalize_id_filter(filter)?;
        strip_update_identity(&mut update);

        let handle = self.database.collection::<Document>(collection);
        let options = UpdateOptions::builder().upsert(true).build();
        let result = handle
            .update_one(filter, update, options)
            .await
            .map_err(|err| store_error("upsert", collection, &err))?;

        Ok(result.upserted_id.and_then(|id| match id {
            Bson::ObjectId(oid) => Some(oid.to_hex()),
            Bson::String(raw) => Some(raw),
            _ => None,
        }))
    }
}

fn store_error(operation: &str, collection: &str, err: &mongodb::error::Error) -> PowercheckError {
    tracing::error!(%err, collection, operation, "document store operation failed");
    PowercheckError::StoreUnavailable(err.to_string())
}
