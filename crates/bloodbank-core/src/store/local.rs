//! Local JSON document store.
//!
//! Each collection lives in `{data_dir}/{collection}.json`. A missing file is
//! an empty collection. Hospitals can be seeded by editing `hospitals.json`
//! by hand.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use super::{generate_document_id, DataStore, Document, DocumentId, NewDocument, StoreError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionFile {
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub documents: Vec<Document>,
}

pub struct LocalStore {
    data_dir: PathBuf,
    /// Serializes reads and read-modify-write cycles on collection files
    write_lock: Mutex<()>,
}

impl LocalStore {
    pub fn new(data_dir: PathBuf) -> Result<Self, StoreError> {
        std::fs::create_dir_all(&data_dir)?;
        Ok(Self {
            data_dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn data_dir(&self) -> &PathBuf {
        &self.data_dir
    }

    fn collection_path(&self, collection: &str) -> Result<PathBuf, StoreError> {
        let valid = !collection.is_empty()
            && collection
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::Config(format!("Invalid collection name: {:?}", collection)));
        }
        Ok(self.data_dir.join(format!("{}.json", collection)))
    }

    fn load(&self, collection: &str) -> Result<CollectionFile, StoreError> {
        let path = self.collection_path(collection)?;
        if !path.exists() {
            return Ok(CollectionFile::default());
        }

        let contents = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Write to a sibling temp file and rename it over the collection, so a
    /// reader sees either the old file or the new one.
    fn save(&self, collection: &str, file: &CollectionFile) -> Result<(), StoreError> {
        let path = self.collection_path(collection)?;
        let tmp_path = path.with_extension("json.tmp");
        let contents = serde_json::to_string_pretty(file)?;
        std::fs::write(&tmp_path, contents)?;
        std::fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>, StoreError> {
        self.write_lock
            .lock()
            .map_err(|_| StoreError::Config("Local store lock poisoned".to_string()))
    }
}

#[async_trait]
impl DataStore for LocalStore {
    fn backend_name(&self) -> &'static str {
        "local"
    }

    async fn fetch_all(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let file = {
            let _guard = self.lock()?;
            self.load(collection)?
        };
        debug!(collection, count = file.documents.len(), "Loaded local collection");
        Ok(file.documents)
    }

    async fn insert(&self, collection: &str, document: NewDocument) -> Result<DocumentId, StoreError> {
        let _guard = self.lock()?;

        let mut file = self.load(collection)?;
        let now = Utc::now();

        let mut fields = document.fields;
        if let Some(field) = document.server_timestamp {
            fields.insert(
                field,
                Value::String(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
            );
        }

        let id = generate_document_id();
        file.documents.push(Document {
            id: id.clone(),
            fields,
        });
        file.updated_at = Some(now);
        self.save(collection, &file)?;

        info!(collection, id = %id, "Document created");
        Ok(id)
    }
}
