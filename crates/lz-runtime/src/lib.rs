//! # lz-runtime
//!
//! Converges declarations against a remote control plane.
//!
//! - [`adapter`]: the `RemoteLookup` / `RemoteMutator` seams adapters implement
//! - [`engine`]: one declaration in, one [`lz_core::ApplyOutcome`] out
//! - [`orchestrator`]: the sequential run fold with escalation and the
//!   settling delay
//! - [`memory`]: an in-memory remote for tests and offline previews

pub mod adapter;
pub mod engine;
pub mod memory;
pub mod orchestrator;
pub mod report;

pub use adapter::{
    PolicyAssignmentRequest, Remote, RemoteAssignment, RemoteError, RemoteGroup, RemoteLookup,
    RemoteMutator,
};
pub use engine::{converge, qualified_identity};
pub use memory::{InMemoryRemote, MutationCall};
pub use orchestrator::Applier;
pub use report::{RunReport, RunSummary};
