//! Domain layer for memberscan
//!
//! This module contains the membership models, the port traits that adapters
//! implement, and the typed error taxonomy.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{CandidateSourceError, CycleError, NotifyError, StoreError, ValidationError};
