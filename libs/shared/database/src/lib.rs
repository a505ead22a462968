pub mod error;
pub mod memory;
pub mod rest;
pub mod store;

pub use error::DatabaseError;
pub use memory::MemoryDocumentStore;
pub use rest::RestDocumentStore;
pub use store::{CollectionPath, Condition, DocumentStore, WriteOp};
