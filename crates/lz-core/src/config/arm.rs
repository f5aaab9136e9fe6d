//! Azure Resource Manager connection settings.

use serde::{Deserialize, Serialize};
use std::env;

/// How to reach the ARM control plane.
///
/// Authentication is not performed here: callers supply a bearer token that
/// was acquired elsewhere (e.g. `az account get-access-token`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmConfig {
    /// ARM endpoint, e.g. "https://management.azure.com".
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Environment variable holding the bearer token.
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ArmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            token_env: default_token_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ArmConfig {
    /// Read the bearer token from the configured environment variable.
    pub fn token_from_env(&self) -> Option<String> {
        env::var(&self.token_env)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }
}

fn default_endpoint() -> String {
    "https://management.azure.com".to_string()
}

fn default_token_env() -> String {
    "ARM_ACCESS_TOKEN".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}
