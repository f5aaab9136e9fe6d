//! Audit storage backends.

use crate::error::AuditError;
use crate::event::AuditEvent;
use crate::logger::AuditFilter;
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};
use uuid::Uuid;

/// Trait for audit storage backends.
#[async_trait]
pub trait AuditStorage: Send + Sync {
    /// Store an audit event.
    async fn store(&self, event: AuditEvent) -> Result<(), AuditError>;

    /// Query audit events with filters.
    async fn query(&self, filter: AuditFilter) -> Result<Vec<AuditEvent>, AuditError>;

    /// Get an audit event by ID.
    async fn get(&self, event_id: Uuid) -> Result<Option<AuditEvent>, AuditError>;
}

/// Console storage: human-readable lines on stderr, so `--json` reports on
/// stdout stay parseable.
#[derive(Debug, Default)]
pub struct ConsoleStorage;

impl ConsoleStorage {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuditStorage for ConsoleStorage {
    async fn store(&self, event: AuditEvent) -> Result<(), AuditError> {
        eprintln!("{}", event.to_log_line());
        Ok(())
    }

    async fn query(&self, _filter: AuditFilter) -> Result<Vec<AuditEvent>, AuditError> {
        Ok(vec![])
    }

    async fn get(&self, _event_id: Uuid) -> Result<Option<AuditEvent>, AuditError> {
        Ok(None)
    }
}

/// Discards everything.
#[derive(Debug, Default)]
pub struct NullStorage;

impl NullStorage {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuditStorage for NullStorage {
    async fn store(&self, _event: AuditEvent) -> Result<(), AuditError> {
        Ok(())
    }

    async fn query(&self, _filter: AuditFilter) -> Result<Vec<AuditEvent>, AuditError> {
        Ok(vec![])
    }

    async fn get(&self, _event_id: Uuid) -> Result<Option<AuditEvent>, AuditError> {
        Ok(None)
    }
}

/// In-memory storage. Used by tests and by callers that want the trail
/// without touching the filesystem.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    events: RwLock<Vec<AuditEvent>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, event: AuditEvent) -> Result<(), AuditError> {
        self.events
            .write()
            .map_err(|e| AuditError::StorageError(format!("Failed to acquire write lock: {}", e)))?
            .push(event);
        Ok(())
    }

    fn snapshot(&self) -> Result<Vec<AuditEvent>, AuditError> {
        self.events
            .read()
            .map(|events| events.clone())
            .map_err(|e| AuditError::StorageError(format!("Failed to acquire read lock: {}", e)))
    }
}

#[async_trait]
impl AuditStorage for MemoryStorage {
    async fn store(&self, event: AuditEvent) -> Result<(), AuditError> {
        self.push(event)
    }

    async fn query(&self, filter: AuditFilter) -> Result<Vec<AuditEvent>, AuditError> {
        Ok(filter.apply(self.snapshot()?))
    }

    async fn get(&self, event_id: Uuid) -> Result<Option<AuditEvent>, AuditError> {
        Ok(self
            .snapshot()?
            .into_iter()
            .find(|e| e.event_id == event_id))
    }
}

/// File storage: appends JSON Lines and keeps the events of this process in
/// memory for querying.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    file: Mutex<std::fs::File>,
    cache: MemoryStorage,
}

impl FileStorage {
    /// Open (or create) the log file for appending.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                AuditError::InitializationFailed(format!("{}: {}", path.display(), e))
            })?;
        Ok(Self {
            path,
            file: Mutex::new(file),
            cache: MemoryStorage::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AuditStorage for FileStorage {
    async fn store(&self, event: AuditEvent) -> Result<(), AuditError> {
        let json = serde_json::to_string(&event)?;
        {
            let mut file = self.file.lock().map_err(|e| {
                AuditError::StorageError(format!("Failed to lock audit file: {}", e))
            })?;
            writeln!(file, "{}", json)?;
        }
        self.cache.push(event)
    }

    async fn query(&self, filter: AuditFilter) -> Result<Vec<AuditEvent>, AuditError> {
        self.cache.query(filter).await
    }

    async fn get(&self, event_id: Uuid) -> Result<Option<AuditEvent>, AuditError> {
        self.cache.get(event_id).await
    }
}

/// File plus console.
#[derive(Debug)]
pub struct DualStorage {
    file: FileStorage,
    console: ConsoleStorage,
}

impl DualStorage {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        Ok(Self {
            file: FileStorage::new(path)?,
            console: ConsoleStorage::new(),
        })
    }
}

#[async_trait]
impl AuditStorage for DualStorage {
    async fn store(&self, event: AuditEvent) -> Result<(), AuditError> {
        self.console.store(event.clone()).await?;
        self.file.store(event).await
    }

    async fn query(&self, filter: AuditFilter) -> Result<Vec<AuditEvent>, AuditError> {
        self.file.query(filter).await
    }

    async fn get(&self, event_id: Uuid) -> Result<Option<AuditEvent>, AuditError> {
        self.file.get(event_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::AuditEventType;

    #[tokio::test]
    async fn test_console_storage() {
        let storage = ConsoleStorage::new();
        let event = AuditEvent::new(AuditEventType::RunStarted, Uuid::new_v4(), false);

        storage.store(event).await.unwrap();
    }

    #[tokio::test]
    async fn test_file_storage_writes_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("audit.log");
        let storage = FileStorage::new(&path).unwrap();

        let run_id = Uuid::new_v4();
        let first = AuditEvent::new(AuditEventType::RunStarted, run_id, false);
        let first_id = first.event_id;
        storage.store(first).await.unwrap();
        storage
            .store(AuditEvent::new(AuditEventType::RunCompleted, run_id, false))
            .await
            .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: AuditEvent = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed.event_id, first_id);
        assert_eq!(parsed.event_type, AuditEventType::RunStarted);

        assert!(storage.get(first_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_memory_storage_query() {
        let storage = MemoryStorage::new();
        let run_a = Uuid::new_v4();
        let run_b = Uuid::new_v4();

        storage
            .store(AuditEvent::new(AuditEventType::RunStarted, run_a, false))
            .await
            .unwrap();
        storage
            .store(AuditEvent::new(AuditEventType::RunStarted, run_b, true))
            .await
            .unwrap();

        let filter = AuditFilter {
            run_id: Some(run_a),
            ..Default::default()
        };
        let results = storage.query(filter).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].run_id, run_a);
    }
}
