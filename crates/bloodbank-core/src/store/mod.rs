//! Document store module.
//!
//! This module provides the `DataStore` contract consumed by the dashboard
//! and the registration form, plus two backends:
//!
//! - `FirestoreStore`: Cloud Firestore over its v1 REST API
//! - `LocalStore`: One JSON file per collection, for offline or demo use
//!
//! The store handle is built once per process by `connect` and handed to
//! consumers as an `Arc<dyn DataStore>`.

pub mod error;
pub mod firestore;
pub mod local;

pub use error::StoreError;
pub use firestore::FirestoreStore;
pub use local::LocalStore;

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Collection holding donor documents.
pub const DONORS_COLLECTION: &str = "donors";

/// Collection holding hospital documents.
pub const HOSPITALS_COLLECTION: &str = "hospitals";

/// Length of auto-generated document ids (matches Firestore client libraries).
const DOCUMENT_ID_LENGTH: usize = 20;

/// A loosely-typed document body.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Identifier of a stored document.
pub type DocumentId = String;

/// A fetched document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub fields: Record,
}

/// A document to be created.
///
/// `server_timestamp` names a field the store fills with its own creation
/// time, so the value never comes from the client clock.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewDocument {
    pub fields: Record,
    pub server_timestamp: Option<String>,
}

impl NewDocument {
    pub fn new(fields: Record) -> Self {
        Self {
            fields,
            server_timestamp: None,
        }
    }

    pub fn with_server_timestamp(mut self, field: impl Into<String>) -> Self {
        self.server_timestamp = Some(field.into());
        self
    }
}

/// Generic document store.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Short backend name for logs and the status bar.
    fn backend_name(&self) -> &'static str;

    /// Fetch every document in a collection. Order is unspecified.
    async fn fetch_all(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    /// Create a document and return its id.
    async fn insert(&self, collection: &str, document: NewDocument) -> Result<DocumentId, StoreError>;
}

/// Backend selection and its settings.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreSettings {
    Firestore {
        project_id: String,
        database: String,
        access_token: Option<String>,
        emulator_host: Option<String>,
    },
    Local {
        data_dir: PathBuf,
    },
}

impl StoreSettings {
    pub fn build(&self) -> Result<Arc<dyn DataStore>, StoreError> {
        let store: Arc<dyn DataStore> = match self {
            StoreSettings::Firestore {
                project_id,
                database,
                access_token,
                emulator_host,
            } => {
                let mut store = FirestoreStore::new(project_id, database)?;
                if let Some(host) = emulator_host {
                    store = store.with_emulator_host(host);
                }
                if let Some(token) = access_token {
                    store = store.with_token(token.clone());
                }
                Arc::new(store)
            }
            StoreSettings::Local { data_dir } => Arc::new(LocalStore::new(data_dir.clone())?),
        };
        Ok(store)
    }
}

/// Process-wide store handle, built on first use
static STORE: OnceLock<Arc<dyn DataStore>> = OnceLock::new();

/// Build the store on first call and return the same handle afterwards.
///
/// Later calls ignore `settings`. Callers pass the returned handle on
/// explicitly rather than reaching for it again.
pub fn connect(settings: &StoreSettings) -> Result<Arc<dyn DataStore>, StoreError> {
    if let Some(store) = STORE.get() {
        return Ok(Arc::clone(store));
    }

    let store = settings.build()?;
    info!(backend = store.backend_name(), "Document store initialized");
    // A racing initializer may have won; keep whichever landed first.
    let _ = STORE.set(Arc::clone(&store));
    Ok(STORE.get().map(Arc::clone).unwrap_or(store))
}

/// Random alphanumeric document id.
pub fn generate_document_id() -> DocumentId {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(DOCUMENT_ID_LENGTH)
        .map(char::from)
        .collect()
}
