use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::store::{matches_all, CollectionPath, Condition, DocumentStore, WriteOp};

type Collection = BTreeMap<String, Value>;

/// Process-local document store. Every write holds the single lock for its
/// whole check-then-write, so conditional writes and batches are atomic.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<CollectionPath, Collection>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document under a caller-chosen id (doctor/patient directories).
    pub async fn insert(&self, collection: &CollectionPath, id: &str, data: Value) -> Result<(), DatabaseError> {
        let mut document = into_object(data)?;
        document.insert("id".to_string(), Value::String(id.to_string()));

        let mut collections = self.collections.write().await;
        collections
            .entry(collection.clone())
            .or_default()
            .insert(id.to_string(), Value::Object(document));
        Ok(())
    }

    pub async fn count(&self, collection: &CollectionPath) -> usize {
        let collections = self.collections.read().await;
        collections.get(collection).map(|c| c.len()).unwrap_or(0)
    }
}

fn into_object(data: Value) -> Result<Map<String, Value>, DatabaseError> {
    match data {
        Value::Object(map) => Ok(map),
        other => Err(DatabaseError::InvalidDocument(format!(
            "expected a JSON object, got {}",
            other
        ))),
    }
}

fn merge(target: &mut Value, partial: Map<String, Value>) {
    if let Value::Object(existing) = target {
        for (key, value) in partial {
            // The document key is immutable.
            if key != "id" {
                existing.insert(key, value);
            }
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &CollectionPath, id: &str) -> Result<Option<Value>, DatabaseError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|c| c.get(id))
            .cloned())
    }

    async fn list(&self, collection: &CollectionPath, filter: &[Condition]) -> Result<Vec<Value>, DatabaseError> {
        let collections = self.collections.read().await;
        let documents = collections
            .get(collection)
            .map(|c| {
                c.values()
                    .filter(|doc| matches_all(filter, doc))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(documents)
    }

    async fn create(&self, collection: &CollectionPath, data: Value) -> Result<String, DatabaseError> {
        let mut document = into_object(data)?;
        let id = Uuid::new_v4().to_string();
        document.insert("id".to_string(), Value::String(id.clone()));

        let mut collections = self.collections.write().await;
        collections
            .entry(collection.clone())
            .or_default()
            .insert(id.clone(), Value::Object(document));

        debug!("Created {}/{}", collection, id);
        Ok(id)
    }

    async fn update(&self, collection: &CollectionPath, id: &str, partial: Value) -> Result<(), DatabaseError> {
        self.update_if(collection, id, &[], partial).await
    }

    async fn update_if(
        &self,
        collection: &CollectionPath,
        id: &str,
        precondition: &[Condition],
        partial: Value,
    ) -> Result<(), DatabaseError> {
        let partial = into_object(partial)?;

        let mut collections = self.collections.write().await;
        let document = collections
            .get_mut(collection)
            .and_then(|c| c.get_mut(id))
            .ok_or_else(|| DatabaseError::not_found(collection, id))?;

        if !matches_all(precondition, document) {
            return Err(DatabaseError::precondition_failed(collection, id));
        }

        merge(document, partial);
        Ok(())
    }

    async fn delete(&self, collection: &CollectionPath, id: &str) -> Result<(), DatabaseError> {
        self.delete_if(collection, id, &[]).await
    }

    async fn delete_if(
        &self,
        collection: &CollectionPath,
        id: &str,
        precondition: &[Condition],
    ) -> Result<(), DatabaseError> {
        let mut collections = self.collections.write().await;
        let documents = collections
            .get_mut(collection)
            .ok_or_else(|| DatabaseError::not_found(collection, id))?;

        let document = documents
            .get(id)
            .ok_or_else(|| DatabaseError::not_found(collection, id))?;

        if !matches_all(precondition, document) {
            return Err(DatabaseError::precondition_failed(collection, id));
        }

        documents.remove(id);
        Ok(())
    }

    async fn commit(&self, ops: Vec<WriteOp>) -> Result<(), DatabaseError> {
        // Validate every payload before touching state so the batch cannot
        // be half-applied.
        let mut prepared = Vec::with_capacity(ops.len());
        let mut required = Vec::new();
        for op in ops {
            match op {
                WriteOp::Require { collection, id, when } => required.push((collection, id, when)),
                WriteOp::Delete { collection, id } => prepared.push((collection, id, None)),
                WriteOp::Patch { collection, id, data, when } => {
                    prepared.push((collection, id, Some((into_object(data)?, when))))
                }
            }
        }

        let mut collections = self.collections.write().await;
        for (collection, id, when) in &required {
            let document = collections
                .get(collection)
                .and_then(|documents| documents.get(id))
                .ok_or_else(|| DatabaseError::not_found(collection, id))?;
            if !matches_all(when, document) {
                return Err(DatabaseError::precondition_failed(collection, id));
            }
        }

        for (collection, id, patch) in prepared {
            let Some(documents) = collections.get_mut(&collection) else {
                continue;
            };
            match patch {
                None => {
                    documents.remove(&id);
                }
                Some((data, when)) => {
                    if let Some(document) = documents.get_mut(&id) {
                        if matches_all(&when, document) {
                            merge(document, data);
                        }
                    }
                }
            }
        }

        Ok(())
    }
}
