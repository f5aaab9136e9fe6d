//! Policy assignments for the Fabric landing zone.
//!
//! [`catalog`] is the flat table of built-in policy definitions the landing
//! zone uses; [`assignments`] turns the configured policy categories into
//! `PolicyAssignment` declarations for the planner.

pub mod assignments;
pub mod catalog;

pub use assignments::{advisories, build_assignments};
pub use catalog::{CATALOG, PolicyDefinition, PolicyKind, definition, find_by_resource_id};
