//! # lz-audit
//!
//! Audit trail for landing-zone convergence runs.
//!
//! Every run gets a correlation id. The trail records:
//! - `RunStarted` with the number of declarations and the naming prefix
//! - one `OutcomeRecorded` per declaration that reached a terminal state
//! - `RunCompleted` or `RunAborted` (with the count of declarations never
//!   attempted)
//!
//! ## Output
//!
//! - **File**: JSON Lines, one event per line
//! - **Console**: human-readable lines on stderr
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use lz_audit::AuditLogger;
//! use lz_core::config::AuditConfig;
//! use uuid::Uuid;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let logger = AuditLogger::new(AuditConfig::default())?;
//! let run_id = Uuid::new_v4();
//!
//! logger.log_run_started(run_id, true, 14, "Fabric").await?;
//! logger.log_run_finished(run_id, true, false, 14, 0).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod event;
pub mod logger;
pub mod storage;

pub use error::AuditError;
pub use event::{AuditEvent, AuditEventBuilder, AuditEventType};
pub use logger::{AuditFilter, AuditLogger};
pub use storage::{AuditStorage, ConsoleStorage, DualStorage, FileStorage, MemoryStorage, NullStorage};
