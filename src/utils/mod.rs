//! Shared utilities

pub mod error;

pub use error::{ReplayError, ReplayResult};
