use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use tracing::{debug, error};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::error::DatabaseError;
use crate::store::{CollectionPath, Condition, DocumentStore, WriteOp};

/// Document store backed by a PostgREST-compatible HTTP API.
///
/// Each collection is a table named after the last path segment. A
/// sub-collection such as `doctors/{id}/slots` becomes table `slots` scoped
/// by a `doctorId=eq.{id}` filter.
pub struct RestDocumentStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestDocumentStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.store_url.trim_end_matches('/').to_string(),
            api_key: config.store_api_key.clone(),
        }
    }

    fn get_headers(&self, return_representation: bool) -> Result<HeaderMap, DatabaseError> {
        let mut headers = HeaderMap::new();

        let api_key = HeaderValue::from_str(&self.api_key)
            .map_err(|_| DatabaseError::Transport("API key is not a valid header value".to_string()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|_| DatabaseError::Transport("API key is not a valid header value".to_string()))?;

        headers.insert("apikey", api_key);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if return_representation {
            headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        }

        Ok(headers)
    }

    async fn request<T>(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<Value>,
        return_representation: bool,
    ) -> Result<T, DatabaseError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut req = self
            .client
            .request(method, &url)
            .headers(self.get_headers(return_representation)?)
            .query(query);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("Store API error ({}): {}", status, error_text);

            return Err(DatabaseError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let bytes = response.bytes().await?;
        let data = if bytes.is_empty() {
            serde_json::from_value::<T>(Value::Null)
                .or_else(|_| serde_json::from_value::<T>(Value::Array(Vec::new())))?
        } else {
            serde_json::from_slice::<T>(&bytes)?
        };
        Ok(data)
    }

    fn table_path(collection: &CollectionPath) -> String {
        format!("/rest/v1/{}", collection.leaf())
    }

    /// Implicit filter for sub-collections: `doctors/{id}/slots` -> `doctorId`.
    fn scope(collection: &CollectionPath) -> Option<(String, String)> {
        collection.parent().map(|(parent, parent_id)| {
            let singular = parent.strip_suffix('s').unwrap_or(parent);
            (format!("{}Id", singular), parent_id.to_string())
        })
    }

    fn build_query(collection: &CollectionPath, id: Option<&str>, conditions: &[Condition]) -> Vec<(String, String)> {
        let mut query = Vec::new();

        if let Some(id) = id {
            query.push(("id".to_string(), format!("eq.{}", id)));
        }
        if let Some((field, value)) = Self::scope(collection) {
            query.push((field, format!("eq.{}", value)));
        }
        query.extend(conditions.iter().map(Condition::to_query));

        query
    }

    fn encode_conditions(conditions: &[Condition]) -> Value {
        Value::Array(
            conditions
                .iter()
                .map(|condition| {
                    let (op, value) = match condition {
                        Condition::Eq(_, value) => ("eq", value),
                        Condition::Gte(_, value) => ("gte", value),
                        Condition::Lte(_, value) => ("lte", value),
                    };
                    json!({ "field": condition.field(), "op": op, "value": value })
                })
                .collect(),
        )
    }

    fn encode_op(op: &WriteOp) -> Value {
        match op {
            WriteOp::Require { collection, id, when } => json!({
                "op": "require",
                "table": collection.leaf(),
                "scope": Self::scope(collection).map(|(field, value)| json!({ field: value })),
                "id": id,
                "when": Self::encode_conditions(when),
            }),
            WriteOp::Delete { collection, id } => json!({
                "op": "delete",
                "table": collection.leaf(),
                "scope": Self::scope(collection).map(|(field, value)| json!({ field: value })),
                "id": id,
            }),
            WriteOp::Patch { collection, id, data, when } => json!({
                "op": "patch",
                "table": collection.leaf(),
                "scope": Self::scope(collection).map(|(field, value)| json!({ field: value })),
                "id": id,
                "data": data,
                "when": Self::encode_conditions(when),
            }),
        }
    }

    /// Filtered PATCH/DELETE returned nothing: tell a missing document apart
    /// from one that failed the precondition.
    async fn explain_empty_write(&self, collection: &CollectionPath, id: &str) -> DatabaseError {
        match self.get(collection, id).await {
            Ok(Some(_)) => DatabaseError::precondition_failed(collection, id),
            Ok(None) => DatabaseError::not_found(collection, id),
            Err(e) => e,
        }
    }
}

#[async_trait]
impl DocumentStore for RestDocumentStore {
    async fn get(&self, collection: &CollectionPath, id: &str) -> Result<Option<Value>, DatabaseError> {
        let query = Self::build_query(collection, Some(id), &[]);
        let result: Vec<Value> = self
            .request(Method::GET, &Self::table_path(collection), &query, None, false)
            .await?;

        Ok(result.into_iter().next())
    }

    async fn list(&self, collection: &CollectionPath, filter: &[Condition]) -> Result<Vec<Value>, DatabaseError> {
        let query = Self::build_query(collection, None, filter);
        self.request(Method::GET, &Self::table_path(collection), &query, None, false)
            .await
    }

    async fn create(&self, collection: &CollectionPath, data: Value) -> Result<String, DatabaseError> {
        let mut document: Map<String, Value> = match data {
            Value::Object(map) => map,
            other => {
                return Err(DatabaseError::InvalidDocument(format!(
                    "expected a JSON object, got {}",
                    other
                )))
            }
        };

        let id = Uuid::new_v4().to_string();
        document.insert("id".to_string(), Value::String(id.clone()));
        if let Some((field, value)) = Self::scope(collection) {
            document.insert(field, Value::String(value));
        }

        let result: Vec<Value> = self
            .request(
                Method::POST,
                &Self::table_path(collection),
                &[],
                Some(Value::Object(document)),
                true,
            )
            .await?;

        if result.is_empty() {
            return Err(DatabaseError::Api {
                status: 200,
                message: format!("Failed to create document in {}", collection),
            });
        }

        debug!("Created {}/{}", collection, id);
        Ok(id)
    }

    async fn update(&self, collection: &CollectionPath, id: &str, partial: Value) -> Result<(), DatabaseError> {
        let query = Self::build_query(collection, Some(id), &[]);
        let result: Vec<Value> = self
            .request(Method::PATCH, &Self::table_path(collection), &query, Some(partial), true)
            .await?;

        if result.is_empty() {
            return Err(DatabaseError::not_found(collection, id));
        }
        Ok(())
    }

    async fn update_if(
        &self,
        collection: &CollectionPath,
        id: &str,
        precondition: &[Condition],
        partial: Value,
    ) -> Result<(), DatabaseError> {
        let query = Self::build_query(collection, Some(id), precondition);
        let result: Vec<Value> = self
            .request(Method::PATCH, &Self::table_path(collection), &query, Some(partial), true)
            .await?;

        if result.is_empty() {
            return Err(self.explain_empty_write(collection, id).await);
        }
        Ok(())
    }

    async fn delete(&self, collection: &CollectionPath, id: &str) -> Result<(), DatabaseError> {
        let query = Self::build_query(collection, Some(id), &[]);
        let result: Vec<Value> = self
            .request(Method::DELETE, &Self::table_path(collection), &query, None, true)
            .await?;

        if result.is_empty() {
            return Err(DatabaseError::not_found(collection, id));
        }
        Ok(())
    }

    async fn delete_if(
        &self,
        collection: &CollectionPath,
        id: &str,
        precondition: &[Condition],
    ) -> Result<(), DatabaseError> {
        let query = Self::build_query(collection, Some(id), precondition);
        let result: Vec<Value> = self
            .request(Method::DELETE, &Self::table_path(collection), &query, None, true)
            .await?;

        if result.is_empty() {
            return Err(self.explain_empty_write(collection, id).await);
        }
        Ok(())
    }

    async fn commit(&self, ops: Vec<WriteOp>) -> Result<(), DatabaseError> {
        let body = json!({
            "ops": ops.iter().map(Self::encode_op).collect::<Vec<_>>()
        });

        // commit_batch raises 409 when a `require` op does not hold.
        let required = ops.iter().find_map(|op| match op {
            WriteOp::Require { collection, id, .. } => Some((collection, id)),
            _ => None,
        });
        match self
            .request::<Value>(Method::POST, "/rest/v1/rpc/commit_batch", &[], Some(body), false)
            .await
        {
            Ok(_) => Ok(()),
            Err(DatabaseError::Api { status: 409, message }) => match required {
                Some((collection, id)) => Err(DatabaseError::precondition_failed(collection, id)),
                None => Err(DatabaseError::Api { status: 409, message }),
            },
            Err(e) => Err(e),
        }
    }
}
