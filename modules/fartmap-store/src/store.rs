//! Whole-collection persistence. Stores hand back raw JSON records so a
//! single bad record never fails a read; decoding happens in [`EventLog`].
//!
//! [`EventLog`]: crate::EventLog

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;
use tracing::{debug, info};

use crate::error::{Result, StoreError};

#[async_trait]
pub trait EventStore: Send + Sync {
    /// Every stored record, in insertion order.
    async fn read_all(&self) -> Result<Vec<Value>>;

    /// Replace the whole collection.
    async fn write_all(&self, records: &[Value]) -> Result<()>;
}

// ---------------------------------------------------------------------------
// JsonFileStore (production: one JSON array on disk)
// ---------------------------------------------------------------------------

pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn ensure_parent(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl EventStore for JsonFileStore {
    /// A missing file reads as empty. Reading never writes; the file is
    /// created by the first [`write_all`](EventStore::write_all).
    async fn read_all(&self) -> Result<Vec<Value>> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Event file not created yet");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        match serde_json::from_str::<Value>(&raw)? {
            Value::Array(records) => Ok(records),
            other => Err(StoreError::Corrupt(format!(
                "{} holds a JSON {} instead of an array",
                self.path.display(),
                json_kind(&other)
            ))),
        }
    }

    async fn write_all(&self, records: &[Value]) -> Result<()> {
        self.ensure_parent().await?;
        let body = serde_json::to_string_pretty(records)?;
        let temp = self.temp_path();
        let created = !fs::try_exists(&self.path).await?;
        fs::write(&temp, body).await?;
        fs::rename(&temp, &self.path).await?;
        if created {
            info!(path = %self.path.display(), "Created event file");
        }
        debug!(path = %self.path.display(), records = records.len(), "Wrote event file");
        Ok(())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// MemoryStore (tests: no filesystem required)
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<Value>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }

    /// Snapshot of the raw records (for test assertions).
    pub fn records(&self) -> Vec<Value> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn read_all(&self) -> Result<Vec<Value>> {
        Ok(self.records())
    }

    async fn write_all(&self, records: &[Value]) -> Result<()> {
        *self
            .records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = records.to_vec();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Arc<S> blanket: the server holds `Arc<dyn EventStore>` and tests
// keep a handle for assertions
// ---------------------------------------------------------------------------

#[async_trait]
impl<S: EventStore + ?Sized> EventStore for Arc<S> {
    async fn read_all(&self) -> Result<Vec<Value>> {
        (**self).read_all().await
    }

    async fn write_all(&self, records: &[Value]) -> Result<()> {
        (**self).write_all(records).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn file_store_reads_missing_file_as_empty_without_creating_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("farts.json");
        let store = JsonFileStore::new(&path);
        assert!(store.read_all().await.unwrap().is_empty());
        assert!(!path.exists());

        store.write_all(&[json!({"encodedLat": "1"})]).await.unwrap();
        assert!(path.exists());
        assert_eq!(store.read_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn file_store_round_trips_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("farts.json"));
        let records = vec![json!({"encodedLat": "1"}), json!("not an object")];
        store.write_all(&records).await.unwrap();
        assert_eq!(store.read_all().await.unwrap(), records);
        assert!(!store.temp_path().exists());
    }

    #[tokio::test]
    async fn file_store_rejects_non_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("farts.json");
        std::fs::write(&path, r#"{"oops": true}"#).unwrap();
        let err = JsonFileStore::new(&path).read_all().await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
    }

    #[tokio::test]
    async fn memory_store_replaces_collection() {
        let store = MemoryStore::with_records(vec![json!(1), json!(2)]);
        store.write_all(&[json!(3)]).await.unwrap();
        assert_eq!(store.read_all().await.unwrap(), vec![json!(3)]);
    }
}
