//! Audit trail configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the outcome audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Whether audit logging is enabled.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// JSON Lines file the events are appended to. Set to `null` to write no
    /// file.
    #[serde(default = "default_path")]
    pub path: Option<String>,

    /// Also echo each event to the console (stderr).
    #[serde(default)]
    pub stdout: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            path: default_path(),
            stdout: false,
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_path() -> Option<String> {
    Some("lz-audit.log".to_string())
}
