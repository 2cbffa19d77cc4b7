use crate::error::{Result, StoreError};
use crate::models::SessionDocument;
use crate::store::SessionStore;
use async_trait::async_trait;
use chatflow_types::{Session, SessionId};
use chrono::{DateTime, Utc};
use mongodb::{bson::doc, Client, Collection};

/// MongoDB-backed session store. One document per session, keyed by
/// `session_id`; saves are upserting replaces, so the single-document
/// atomicity of MongoDB provides the per-key write guarantee as long as the
/// caller keeps one loop invocation per session (which the engine does).
#[derive(Clone)]
pub struct MongoSessionStore {
    collection: Collection<SessionDocument>,
}

impl MongoSessionStore {
    pub async fn new(mongodb_uri: &str, db_name: &str) -> Result<Self> {
        let client = Client::with_uri_str(mongodb_uri)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(Self::with_client(&client, db_name))
    }

    pub fn with_client(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("sessions");
        Self { collection }
    }
}

#[async_trait]
impl SessionStore for MongoSessionStore {
    async fn load(&self, id: &SessionId) -> Result<Option<Session>> {
        let filter = doc! { "session_id": id.as_str() };
        let document = self.collection.find_one(filter).await?;
        Ok(document.map(Session::from))
    }

    async fn save(&self, session: &Session) -> Result<()> {
        let document = SessionDocument::from(session);
        let filter = doc! { "session_id": session.id.as_str() };
        self.collection
            .replace_one(filter, &document)
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn delete(&self, id: &SessionId) -> Result<()> {
        let filter = doc! { "session_id": id.as_str() };
        self.collection.delete_one(filter).await?;
        Ok(())
    }

    async fn delete_idle(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let filter = doc! { "updated_at": { "$lt": cutoff.timestamp_millis() } };
        let result = self.collection.delete_many(filter).await?;
        if result.deleted_count > 0 {
            tracing::debug!(removed = result.deleted_count, "swept idle sessions");
        }
        Ok(result.deleted_count)
    }
}
