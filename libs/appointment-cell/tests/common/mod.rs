#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use appointment_cell::models::AppointmentInput;
use doctor_cell::models::CreateSlotRequest;
use doctor_cell::services::ScheduleService;
use shared_config::{AppConfig, SlotReleasePolicy};
use shared_database::{CollectionPath, Condition, DatabaseError, DocumentStore, MemoryDocumentStore, WriteOp};
use shared_utils::test_utils::{MockDocuments, TestConfig};

pub const DOCTOR_ID: &str = "doctor-1";
pub const PATIENT_ID: &str = "patient-1";

pub fn jane() -> AppointmentInput {
    AppointmentInput {
        patient_name: Some("Jane Doe".to_string()),
        patient_email: Some("jane@x.com".to_string()),
        patient_phone: Some("555-1234".to_string()),
        reason: Some("checkup".to_string()),
        date: Some("2025-06-01".to_string()),
        time: Some("09:00".to_string()),
    }
}

pub fn config() -> AppConfig {
    TestConfig::default().to_app_config()
}

pub fn config_with_policy(policy: SlotReleasePolicy) -> AppConfig {
    AppConfig {
        slot_release_policy: policy,
        ..config()
    }
}

/// Memory store with one doctor in the directory.
pub async fn seeded_store() -> Arc<MemoryDocumentStore> {
    let store = Arc::new(MemoryDocumentStore::new());
    store
        .insert(
            &CollectionPath::doctors(),
            DOCTOR_ID,
            MockDocuments::doctor(DOCTOR_ID, "Dr. Amy", "Cardiology"),
        )
        .await
        .unwrap();
    store
}

pub async fn add_slot(store: Arc<dyn DocumentStore>, date: &str, start: &str, end: &str) -> String {
    ScheduleService::new(store)
        .create_slot(DOCTOR_ID, CreateSlotRequest::new(date, start, end))
        .await
        .unwrap()
        .id
}

pub async fn appointment_count(store: &MemoryDocumentStore) -> usize {
    store.count(&CollectionPath::appointments()).await
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fault {
    None,
    /// Conditional writes fail as if the network dropped.
    Transport,
    /// Conditional writes fail as if another writer got there first.
    LostRace,
}

/// Wraps the memory store and injects failures into selected operations.
pub struct FaultyStore {
    pub inner: Arc<MemoryDocumentStore>,
    update_if_fault: Mutex<Fault>,
    fail_delete: AtomicBool,
    stale_status: Mutex<Option<String>>,
}

impl FaultyStore {
    pub fn new(inner: Arc<MemoryDocumentStore>) -> Self {
        Self {
            inner,
            update_if_fault: Mutex::new(Fault::None),
            fail_delete: AtomicBool::new(false),
            stale_status: Mutex::new(None),
        }
    }

    /// The next appointment read reports `status` instead of the stored one,
    /// as if another writer changed it right after the read.
    pub fn serve_stale_status_once(&self, status: &str) {
        *self.stale_status.lock().unwrap() = Some(status.to_string());
    }

    pub fn fail_update_if(&self, fault: Fault) {
        *self.update_if_fault.lock().unwrap() = fault;
    }

    pub fn fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentStore for FaultyStore {
    async fn get(&self, collection: &CollectionPath, id: &str) -> Result<Option<Value>, DatabaseError> {
        let mut document = self.inner.get(collection, id).await?;
        if *collection == CollectionPath::appointments() {
            if let (Some(status), Some(document)) = (self.stale_status.lock().unwrap().take(), document.as_mut()) {
                document["status"] = Value::String(status);
            }
        }
        Ok(document)
    }

    async fn list(&self, collection: &CollectionPath, filter: &[Condition]) -> Result<Vec<Value>, DatabaseError> {
        self.inner.list(collection, filter).await
    }

    async fn create(&self, collection: &CollectionPath, data: Value) -> Result<String, DatabaseError> {
        self.inner.create(collection, data).await
    }

    async fn update(&self, collection: &CollectionPath, id: &str, partial: Value) -> Result<(), DatabaseError> {
        self.inner.update(collection, id, partial).await
    }

    async fn update_if(
        &self,
        collection: &CollectionPath,
        id: &str,
        precondition: &[Condition],
        partial: Value,
    ) -> Result<(), DatabaseError> {
        let fault = *self.update_if_fault.lock().unwrap();
        match fault {
            Fault::None => self.inner.update_if(collection, id, precondition, partial).await,
            Fault::Transport => Err(DatabaseError::Transport("connection reset".to_string())),
            Fault::LostRace => Err(DatabaseError::precondition_failed(collection, id)),
        }
    }

    async fn delete(&self, collection: &CollectionPath, id: &str) -> Result<(), DatabaseError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(DatabaseError::Transport("connection reset".to_string()));
        }
        self.inner.delete(collection, id).await
    }

    async fn delete_if(
        &self,
        collection: &CollectionPath,
        id: &str,
        precondition: &[Condition],
    ) -> Result<(), DatabaseError> {
        self.inner.delete_if(collection, id, precondition).await
    }

    async fn commit(&self, ops: Vec<WriteOp>) -> Result<(), DatabaseError> {
        self.inner.commit(ops).await
    }
}
