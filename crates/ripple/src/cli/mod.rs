//! CLI command implementations.

mod display;

pub mod impact;
pub mod index;
pub mod init;
pub mod stats;
pub mod tables;
pub mod usage;
