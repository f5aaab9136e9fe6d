//! Error types shared by the landing-zone crates.

use std::path::PathBuf;
use thiserror::Error;

/// Why a single declaration could not be converged.
///
/// Absence of a remote resource is not an error: it is what drives creation,
/// so there is no `NotFound` variant here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyError {
    /// The declaration is malformed; rejected before any remote call.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A read against the remote API failed for a reason other than absence.
    #[error("lookup failed for {identity}: {reason}")]
    LookupFailed { identity: String, reason: String },

    /// The remote API rejected or failed a write.
    #[error("mutation failed for {identity}: {reason}")]
    MutationFailed { identity: String, reason: String },
}

impl ApplyError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration(reason.into())
    }

    pub fn lookup_failed(identity: impl Into<String>, reason: impl ToString) -> Self {
        Self::LookupFailed {
            identity: identity.into(),
            reason: reason.to_string(),
        }
    }

    pub fn mutation_failed(identity: impl Into<String>, reason: impl ToString) -> Self {
        Self::MutationFailed {
            identity: identity.into(),
            reason: reason.to_string(),
        }
    }
}

/// Errors raised while loading or validating a landing-zone configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("organization prefix must not be empty")]
    EmptyPrefix,

    #[error("duplicate management group id '{0}'")]
    DuplicateGroup(String),

    #[error("{location} references unknown management group '{group}'")]
    UnknownGroup { location: String, group: String },

    #[error("invalid identifier at {location}: {reason}")]
    InvalidIdentifier { location: String, reason: String },

    #[error("allowed_locations policy is enabled but regions.allowed is empty")]
    NoAllowedRegions,
}
