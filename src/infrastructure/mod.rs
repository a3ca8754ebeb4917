//! Infrastructure layer
//!
//! Configuration loading, logging setup, and project initialization.

pub mod config;
pub mod logging;
pub mod setup;
