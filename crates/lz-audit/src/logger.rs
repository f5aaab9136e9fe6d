//! Audit logger implementation.
//!
//! Provides the main `AuditLogger` type with helpers for the events of a
//! convergence run: start, one outcome per declaration, finish.

use chrono::{DateTime, Utc};
use lz_core::ApplyOutcome;
use lz_core::config::AuditConfig;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::AuditError;
use crate::event::{AuditEvent, AuditEventType};
use crate::storage::{AuditStorage, DualStorage, FileStorage, MemoryStorage, NullStorage};

/// The main audit logger.
pub struct AuditLogger {
    config: AuditConfig,
    storage: Arc<dyn AuditStorage>,
}

impl std::fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLogger")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AuditLogger {
    /// Create a new audit logger with the given configuration.
    pub fn new(config: AuditConfig) -> Result<Self, AuditError> {
        let storage: Arc<dyn AuditStorage> = if !config.enabled {
            Arc::new(NullStorage::new())
        } else {
            match (&config.path, config.stdout) {
                (Some(path), true) => Arc::new(DualStorage::new(path)?),
                (Some(path), false) => Arc::new(FileStorage::new(path)?),
                (None, true) => Arc::new(crate::storage::ConsoleStorage::new()),
                (None, false) => {
                    return Err(AuditError::InitializationFailed(
                        "audit is enabled but neither a path nor stdout is configured".to_string(),
                    ));
                }
            }
        };

        Ok(Self { config, storage })
    }

    /// Create a logger with a custom storage backend.
    pub fn with_storage(config: AuditConfig, storage: Arc<dyn AuditStorage>) -> Self {
        Self { config, storage }
    }

    /// Create a disabled (no-op) logger.
    pub fn disabled() -> Self {
        Self {
            config: AuditConfig {
                enabled: false,
                ..Default::default()
            },
            storage: Arc::new(NullStorage::new()),
        }
    }

    /// Create an enabled logger backed by memory. Useful in tests.
    pub fn in_memory() -> Self {
        Self::with_storage(
            AuditConfig {
                enabled: true,
                path: None,
                stdout: false,
            },
            Arc::new(MemoryStorage::new()),
        )
    }

    /// Check if logging is enabled.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Log an audit event.
    pub async fn log(&self, event: AuditEvent) -> Result<(), AuditError> {
        if !self.config.enabled {
            return Ok(());
        }

        tracing::debug!(
            event_id = %event.event_id,
            event_type = %event.event_type,
            run_id = %event.run_id,
            identity = event.identity.as_deref().unwrap_or(""),
            state = event.state.as_deref().unwrap_or(""),
            "Audit event"
        );

        self.storage.store(event).await
    }

    /// Log the start of a run.
    pub async fn log_run_started(
        &self,
        run_id: Uuid,
        simulated: bool,
        declarations: usize,
        naming_prefix: &str,
    ) -> Result<(), AuditError> {
        let event = AuditEvent::builder(AuditEventType::RunStarted, run_id, simulated)
            .message(format!("{} declarations", declarations))
            .meta(serde_json::json!({
                "declarations": declarations,
                "naming_prefix": naming_prefix,
            }))
            .build();
        self.log(event).await
    }

    /// Log the terminal state of one declaration.
    pub async fn log_outcome(&self, run_id: Uuid, outcome: &ApplyOutcome) -> Result<(), AuditError> {
        self.log(AuditEvent::from_outcome(run_id, outcome)).await
    }

    /// Log the end of a run. `not_attempted` is non-zero only for aborted runs.
    pub async fn log_run_finished(
        &self,
        run_id: Uuid,
        simulated: bool,
        aborted: bool,
        processed: usize,
        not_attempted: usize,
    ) -> Result<(), AuditError> {
        let event_type = if aborted {
            AuditEventType::RunAborted
        } else {
            AuditEventType::RunCompleted
        };
        let message = if aborted {
            format!(
                "aborted after {} declarations, {} not attempted",
                processed, not_attempted
            )
        } else {
            format!("{} declarations processed", processed)
        };
        let event = AuditEvent::builder(event_type, run_id, simulated)
            .message(message)
            .meta(serde_json::json!({
                "processed": processed,
                "not_attempted": not_attempted,
            }))
            .build();
        self.log(event).await
    }

    /// Query audit events.
    pub async fn query(&self, filter: AuditFilter) -> Result<Vec<AuditEvent>, AuditError> {
        self.storage.query(filter).await
    }

    /// Get a specific audit event by ID.
    pub async fn get(&self, event_id: Uuid) -> Result<Option<AuditEvent>, AuditError> {
        self.storage.get(event_id).await
    }
}

/// Filter for querying audit events.
#[derive(Debug, Default, Clone)]
pub struct AuditFilter {
    /// Filter by run.
    pub run_id: Option<Uuid>,
    /// Filter by event type.
    pub event_type: Option<AuditEventType>,
    /// Filter by identity.
    pub identity: Option<String>,
    /// Filter by start time.
    pub start_time: Option<DateTime<Utc>>,
    /// Filter by end time.
    pub end_time: Option<DateTime<Utc>>,
    /// Maximum number of results.
    pub limit: Option<usize>,
    /// Offset for pagination.
    pub offset: Option<usize>,
}

impl AuditFilter {
    pub fn matches(&self, event: &AuditEvent) -> bool {
        if self.run_id.is_some_and(|id| id != event.run_id) {
            return false;
        }
        if self.event_type.is_some_and(|t| t != event.event_type) {
            return false;
        }
        if let Some(ref identity) = self.identity {
            if event.identity.as_ref() != Some(identity) {
                return false;
            }
        }
        if self.start_time.is_some_and(|start| event.occurred_at < start) {
            return false;
        }
        if self.end_time.is_some_and(|end| event.occurred_at > end) {
            return false;
        }
        true
    }

    /// Filter, then apply offset and limit.
    pub fn apply(&self, events: Vec<AuditEvent>) -> Vec<AuditEvent> {
        events
            .into_iter()
            .filter(|e| self.matches(e))
            .skip(self.offset.unwrap_or(0))
            .take(self.limit.unwrap_or(usize::MAX))
            .collect()
    }
}
