use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("Precondition failed for {collection}/{id}")]
    PreconditionFailed { collection: String, id: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Store API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),
}

impl DatabaseError {
    pub fn not_found(collection: impl ToString, id: impl ToString) -> Self {
        DatabaseError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    pub fn precondition_failed(collection: impl ToString, id: impl ToString) -> Self {
        DatabaseError::PreconditionFailed {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }
}

impl From<reqwest::Error> for DatabaseError {
    fn from(e: reqwest::Error) -> Self {
        DatabaseError::Transport(e.to_string())
    }
}
