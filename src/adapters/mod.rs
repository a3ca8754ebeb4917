//! Infrastructure adapters for the scan core's ports.

pub mod memory;
pub mod sinks;
pub mod sources;
pub mod sqlite;
