//! # lz-core
//!
//! Shared types for the Fabric landing-zone provisioner:
//!
//! - [`DesiredResource`]: what should exist remotely (management groups,
//!   subscription placements, policy assignments)
//! - [`ApplyContext`]: run-wide, read-only settings (simulate flag, naming
//!   prefix, default region)
//! - [`ApplyOutcome`]: the structured result of converging one declaration
//! - [`naming`]: identifier rules the remote API enforces
//! - [`config`]: the YAML configuration surface

pub mod config;
pub mod context;
pub mod error;
pub mod naming;
pub mod outcome;
pub mod resource;

pub use config::LandingZoneConfig;
pub use context::{ApplyContext, DEFAULT_SETTLE_DELAY};
pub use error::{ApplyError, ConfigError};
pub use outcome::{ApplyOutcome, ApplyState};
pub use resource::{
    DesiredResource, GroupParent, ManagementGroupSpec, PolicyAssignmentSpec, ResourceKind,
    SubscriptionPlacementSpec,
};
