//! Audit event types.
//!
//! One event per convergence outcome, bracketed by run start/finish events
//! that share the run's correlation id.

use chrono::{DateTime, Utc};
use lz_core::{ApplyOutcome, ResourceKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Type of audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    /// A run began.
    RunStarted,
    /// A declaration reached its terminal state.
    OutcomeRecorded,
    /// A run processed every declaration.
    RunCompleted,
    /// A run stopped early after a fatal outcome.
    RunAborted,
}

impl std::fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RunStarted => write!(f, "RUN_STARTED"),
            Self::OutcomeRecorded => write!(f, "OUTCOME"),
            Self::RunCompleted => write!(f, "RUN_COMPLETED"),
            Self::RunAborted => write!(f, "RUN_ABORTED"),
        }
    }
}

/// An audit event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID.
    pub event_id: Uuid,

    /// When the event occurred.
    pub occurred_at: DateTime<Utc>,

    /// Event type.
    pub event_type: AuditEventType,

    /// Run the event belongs to.
    pub run_id: Uuid,

    /// Whether the run was simulate-only.
    pub simulated: bool,

    // ===== Outcome fields =====
    /// Resource kind (outcome events only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ResourceKind>,

    /// Fully-qualified identity that was checked or created.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,

    /// Terminal state label (`created`, `exists`, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    /// Failure or skip reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message.
    #[serde(default)]
    pub message: String,

    /// Additional metadata.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub meta: serde_json::Value,
}

impl AuditEvent {
    /// Create a new audit event for a run.
    pub fn new(event_type: AuditEventType, run_id: Uuid, simulated: bool) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            event_type,
            run_id,
            simulated,
            kind: None,
            identity: None,
            state: None,
            reason: None,
            message: String::new(),
            meta: serde_json::Value::Null,
        }
    }

    /// Create a builder for an audit event.
    pub fn builder(event_type: AuditEventType, run_id: Uuid, simulated: bool) -> AuditEventBuilder {
        AuditEventBuilder::new(event_type, run_id, simulated)
    }

    /// Event describing one convergence outcome.
    pub fn from_outcome(run_id: Uuid, outcome: &ApplyOutcome) -> Self {
        let reason = match &outcome.state {
            lz_core::ApplyState::Failed(r) | lz_core::ApplyState::Skipped(r) => Some(r.clone()),
            _ => None,
        };
        let mut builder =
            Self::builder(AuditEventType::OutcomeRecorded, run_id, outcome.simulated)
                .kind(outcome.kind)
                .identity(&outcome.identity)
                .state(outcome.state.label())
                .message(&outcome.message);
        if let Some(reason) = reason {
            builder = builder.reason(reason);
        }
        builder.build()
    }

    /// Format the event as a human-readable log line.
    ///
    /// Format: `[timestamp] EVENT_TYPE run=... [kind=... identity=... state=...]`
    pub fn to_log_line(&self) -> String {
        let mut line = format!(
            "[{}] {} run={}",
            self.occurred_at.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            self.event_type,
            self.run_id,
        );

        if self.simulated {
            line.push_str(" simulate=true");
        }
        if let Some(kind) = self.kind {
            line.push_str(&format!(" kind={}", kind));
        }
        if let Some(ref identity) = self.identity {
            line.push_str(&format!(" identity={}", identity));
        }
        if let Some(ref state) = self.state {
            line.push_str(&format!(" state={}", state));
        }
        if let Some(ref reason) = self.reason {
            line.push_str(&format!(" reason=\"{}\"", reason.replace('"', "'")));
        }
        if !self.message.is_empty() && self.reason.as_deref() != Some(self.message.as_str()) {
            line.push_str(&format!(" message=\"{}\"", self.message.replace('"', "'")));
        }

        line
    }
}

/// Builder for creating audit events.
#[derive(Debug)]
pub struct AuditEventBuilder {
    event: AuditEvent,
}

impl AuditEventBuilder {
    pub fn new(event_type: AuditEventType, run_id: Uuid, simulated: bool) -> Self {
        Self {
            event: AuditEvent::new(event_type, run_id, simulated),
        }
    }

    pub fn kind(mut self, kind: ResourceKind) -> Self {
        self.event.kind = Some(kind);
        self
    }

    pub fn identity(mut self, identity: impl Into<String>) -> Self {
        self.event.identity = Some(identity.into());
        self
    }

    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.event.state = Some(state.into());
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.event.reason = Some(reason.into());
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.event.message = message.into();
        self
    }

    /// Set additional metadata.
    pub fn meta(mut self, meta: serde_json::Value) -> Self {
        self.event.meta = meta;
        self
    }

    /// Build the audit event.
    pub fn build(self) -> AuditEvent {
        self.event
    }
}
