//! CLI command implementations.

pub mod history;
pub mod init;
pub mod scan;
pub mod snapshot;
pub mod watch;
