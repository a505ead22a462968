use std::cmp::Ordering;
use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::DatabaseError;

/// Path of a document collection, e.g. `appointments` or `doctors/{id}/slots`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath(String);

impl CollectionPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into().trim_matches('/').to_string())
    }

    pub fn appointments() -> Self {
        Self::new("appointments")
    }

    pub fn doctors() -> Self {
        Self::new("doctors")
    }

    /// Slot sub-collection owned by one doctor. Slot ids are only unique
    /// inside this scope.
    pub fn doctor_slots(doctor_id: &str) -> Self {
        Self(format!("doctors/{}/slots", doctor_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment, i.e. the collection name itself.
    pub fn leaf(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// `(parent collection, parent id)` for sub-collections.
    pub fn parent(&self) -> Option<(&str, &str)> {
        let segments: Vec<&str> = self.0.split('/').collect();
        if segments.len() < 3 {
            return None;
        }
        let n = segments.len();
        Some((segments[n - 3], segments[n - 2]))
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Field comparison used by list filters and conditional writes.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(String, Value),
    Gte(String, Value),
    Lte(String, Value),
}

impl Condition {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Condition::Eq(field.into(), value.into())
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Condition::Gte(field.into(), value.into())
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Condition::Lte(field.into(), value.into())
    }

    pub fn field(&self) -> &str {
        match self {
            Condition::Eq(field, _) | Condition::Gte(field, _) | Condition::Lte(field, _) => field,
        }
    }

    /// Evaluate against a stored document. A missing field reads as `null`.
    pub fn matches(&self, document: &Value) -> bool {
        let actual = document.get(self.field()).unwrap_or(&Value::Null);
        match self {
            Condition::Eq(_, expected) => actual == expected,
            Condition::Gte(_, bound) => {
                matches!(compare_values(actual, bound), Some(Ordering::Greater | Ordering::Equal))
            }
            Condition::Lte(_, bound) => {
                matches!(compare_values(actual, bound), Some(Ordering::Less | Ordering::Equal))
            }
        }
    }

    /// PostgREST query pair, e.g. `("status", "eq.available")`.
    pub fn to_query(&self) -> (String, String) {
        let (op, value) = match self {
            Condition::Eq(_, Value::Null) => return (self.field().to_string(), "is.null".to_string()),
            Condition::Eq(_, value) => ("eq", value),
            Condition::Gte(_, value) => ("gte", value),
            Condition::Lte(_, value) => ("lte", value),
        };
        (self.field().to_string(), format!("{}.{}", op, query_literal(value)))
    }
}

pub fn matches_all(conditions: &[Condition], document: &Value) -> bool {
    conditions.iter().all(|condition| condition.matches(document))
}

fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn query_literal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// One write inside an atomic [`DocumentStore::commit`] batch.
///
/// A missing document, or a `Patch` whose `when` conditions do not hold,
/// turns that op into a no-op. A `Require` that does not hold aborts the
/// whole batch. The batch itself is all-or-nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Require {
        collection: CollectionPath,
        id: String,
        when: Vec<Condition>,
    },
    Delete {
        collection: CollectionPath,
        id: String,
    },
    Patch {
        collection: CollectionPath,
        id: String,
        data: Value,
        when: Vec<Condition>,
    },
}

/// Read/write/query primitives of the hosted document database.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &CollectionPath, id: &str) -> Result<Option<Value>, DatabaseError>;

    async fn list(&self, collection: &CollectionPath, filter: &[Condition]) -> Result<Vec<Value>, DatabaseError>;

    /// Insert a new document and return its generated id.
    async fn create(&self, collection: &CollectionPath, data: Value) -> Result<String, DatabaseError>;

    /// Shallow-merge `partial` into an existing document.
    async fn update(&self, collection: &CollectionPath, id: &str, partial: Value) -> Result<(), DatabaseError>;

    /// Compare-and-swap: merge `partial` only if the stored document satisfies
    /// every condition, checked and written atomically.
    async fn update_if(
        &self,
        collection: &CollectionPath,
        id: &str,
        precondition: &[Condition],
        partial: Value,
    ) -> Result<(), DatabaseError>;

    async fn delete(&self, collection: &CollectionPath, id: &str) -> Result<(), DatabaseError>;

    /// Delete only if the stored document satisfies every condition.
    async fn delete_if(
        &self,
        collection: &CollectionPath,
        id: &str,
        precondition: &[Condition],
    ) -> Result<(), DatabaseError>;

    async fn commit(&self, ops: Vec<WriteOp>) -> Result<(), DatabaseError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_collection_path_segments() {
        let slots = CollectionPath::doctor_slots("doc-1");
        assert_eq!(slots.as_str(), "doctors/doc-1/slots");
        assert_eq!(slots.leaf(), "slots");
        assert_eq!(slots.parent(), Some(("doctors", "doc-1")));

        let appointments = CollectionPath::appointments();
        assert_eq!(appointments.leaf(), "appointments");
        assert_eq!(appointments.parent(), None);
    }

    #[test]
    fn test_condition_matching() {
        let doc = json!({ "date": "2025-06-01", "status": "available", "bookedBy": null });

        assert!(Condition::eq("status", "available").matches(&doc));
        assert!(!Condition::eq("status", "booked").matches(&doc));
        assert!(Condition::eq("bookedBy", Value::Null).matches(&doc));
        assert!(Condition::eq("appointmentId", Value::Null).matches(&doc));
        assert!(Condition::gte("date", "2025-06-01").matches(&doc));
        assert!(!Condition::gte("date", "2025-06-02").matches(&doc));
        assert!(Condition::lte("date", "2025-06-30").matches(&doc));
        assert!(!Condition::gte("missing", "a").matches(&doc));
    }

    #[test]
    fn test_condition_query_encoding() {
        assert_eq!(
            Condition::eq("status", "available").to_query(),
            ("status".to_string(), "eq.available".to_string())
        );
        assert_eq!(
            Condition::gte("date", "2025-06-01").to_query(),
            ("date".to_string(), "gte.2025-06-01".to_string())
        );
        assert_eq!(
            Condition::eq("bookedBy", Value::Null).to_query(),
            ("bookedBy".to_string(), "is.null".to_string())
        );
    }
}
