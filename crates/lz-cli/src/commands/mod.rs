//! CLI command implementations for `fabric-lz`.

pub mod apply;
pub mod check;
pub mod init;
pub mod plan;
