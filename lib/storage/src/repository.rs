// Canonical model repository
// Models live in memory behind a RwLock. When opened on a data directory,
// every mutation rewrites a checksummed JSON file atomically.

use async_trait::async_trait;
use atomicwrites::{AtomicFile, OverwriteBehavior};
use chrono::{DateTime, Utc};
use fieldrecon_core::{Error, Result, TypeHints};
use fieldrecon_similarity::{CanonicalModel, ModelSource};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// File name of the persisted store inside the data directory
pub const STORE_FILE: &str = "models.json";

const STORE_VERSION: u32 = 1;

/// A stored model with bookkeeping timestamps
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelRecord {
    #[serde(flatten)]
    pub model: CanonicalModel,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    saved_at: DateTime<Utc>,
    checksum: String,
    models: Vec<ModelRecord>,
}

fn checksum(models: &[ModelRecord]) -> Result<String> {
    let bytes = serde_json::to_vec(models)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

fn validate_document(document: &Value) -> Result<()> {
    match document {
        Value::Object(_) | Value::Array(_) => Ok(()),
        _ => Err(Error::InvalidDocument(
            "model document must be a JSON object or an array of paths".to_string(),
        )),
    }
}

/// Store of canonical models
pub struct ModelRepository {
    models: RwLock<HashMap<String, ModelRecord>>,
    store_path: Option<PathBuf>,
}

impl ModelRepository {
    /// A repository that is never written to disk
    pub fn in_memory() -> Self {
        Self {
            models: RwLock::new(HashMap::new()),
            store_path: None,
        }
    }

    /// Open (or create) a repository persisted under `data_dir`
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        std::fs::create_dir_all(data_dir)?;
        let store_path = data_dir.join(STORE_FILE);

        let mut models = HashMap::new();
        if store_path.exists() {
            match Self::load(&store_path) {
                Ok(records) => {
                    for record in records {
                        models.insert(record.model.id.clone(), record);
                    }
                    tracing::info!(models = models.len(), path = %store_path.display(), "model store loaded");
                }
                Err(e) => {
                    let aside = store_path.with_extension("json.corrupt");
                    tracing::warn!(
                        error = %e,
                        path = %store_path.display(),
                        moved_to = %aside.display(),
                        "model store unreadable; starting empty"
                    );
                    std::fs::rename(&store_path, &aside)?;
                }
            }
        }

        Ok(Self {
            models: RwLock::new(models),
            store_path: Some(store_path),
        })
    }

    fn load(path: &Path) -> Result<Vec<ModelRecord>> {
        let bytes = std::fs::read(path)?;
        let file: StoreFile = serde_json::from_slice(&bytes)?;
        if file.version != STORE_VERSION {
            return Err(Error::Storage(format!(
                "unsupported store version {}",
                file.version
            )));
        }
        let actual = checksum(&file.models)?;
        if actual != file.checksum {
            return Err(Error::Storage(format!(
                "checksum mismatch: expected {}, got {}",
                file.checksum, actual
            )));
        }
        Ok(file.models)
    }

    /// Write the whole store. Callers hold the write lock.
    fn persist(&self, models: &HashMap<String, ModelRecord>) -> Result<()> {
        let Some(path) = &self.store_path else {
            return Ok(());
        };

        let records = Self::ordered(models);
        let file = StoreFile {
            version: STORE_VERSION,
            saved_at: Utc::now(),
            checksum: checksum(&records)?,
            models: records,
        };
        let bytes = serde_json::to_vec_pretty(&file)?;

        AtomicFile::new(path, OverwriteBehavior::AllowOverwrite)
            .write(|f| f.write_all(&bytes))
            .map_err(|e| Error::Storage(e.to_string()))?;
        tracing::debug!(models = file.models.len(), path = %path.display(), "model store saved");
        Ok(())
    }

    /// Records oldest first, ids breaking ties
    fn ordered(models: &HashMap<String, ModelRecord>) -> Vec<ModelRecord> {
        let mut records: Vec<ModelRecord> = models.values().cloned().collect();
        records.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.model.id.cmp(&b.model.id))
        });
        records
    }

    /// Store a new model under a generated id
    pub fn create(&self, document: Value, type_hints: Option<TypeHints>) -> Result<ModelRecord> {
        let id = Uuid::new_v4().to_string();
        let (record, _) = self.put(&id, document, type_hints)?;
        Ok(record)
    }

    /// Insert or replace the model at `id`. Returns the record and whether it was created.
    pub fn put(
        &self,
        id: &str,
        document: Value,
        type_hints: Option<TypeHints>,
    ) -> Result<(ModelRecord, bool)> {
        if id.trim().is_empty() {
            return Err(Error::InvalidDocument("model id must not be empty".to_string()));
        }
        validate_document(&document)?;

        let mut model = CanonicalModel::from_document(id, document);
        model.type_hints = type_hints;

        let mut models = self.models.write();
        let now = Utc::now();
        let created_at = models.get(id).map(|r| r.created_at);
        let record = ModelRecord {
            model,
            created_at: created_at.unwrap_or(now),
            updated_at: now,
        };
        models.insert(id.to_string(), record.clone());
        self.persist(&models)?;

        tracing::debug!(id, created = created_at.is_none(), "model stored");
        Ok((record, created_at.is_none()))
    }

    #[inline]
    pub fn get(&self, id: &str) -> Option<ModelRecord> {
        self.models.read().get(id).cloned()
    }

    /// Fetch a model or fail with [`Error::ModelNotFound`]
    pub fn require(&self, id: &str) -> Result<ModelRecord> {
        self.get(id)
            .ok_or_else(|| Error::ModelNotFound(id.to_string()))
    }

    pub fn delete(&self, id: &str) -> Result<bool> {
        let mut models = self.models.write();
        if models.remove(id).is_none() {
            return Ok(false);
        }
        self.persist(&models)?;
        tracing::debug!(id, "model deleted");
        Ok(true)
    }

    /// Every record, oldest first
    pub fn list(&self) -> Vec<ModelRecord> {
        Self::ordered(&self.models.read())
    }

    pub fn len(&self) -> usize {
        self.models.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.read().is_empty()
    }

    pub fn store_path(&self) -> Option<&Path> {
        self.store_path.as_deref()
    }
}

impl Default for ModelRepository {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[async_trait]
impl ModelSource for ModelRepository {
    async fn list_models(&self) -> Result<Vec<CanonicalModel>> {
        Ok(self.list().into_iter().map(|r| r.model).collect())
    }
}
