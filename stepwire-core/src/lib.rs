//! # stepwire-core
//!
//! Step implementation model for stepwire.
//!
//! This crate provides:
//! - `Table`, the tabular step parameter handed to step implementations
//! - `StepRegistry`, an explicit pattern-to-handler registration table
//! - Binding of registered patterns to host-resolved step values

pub mod error;
pub mod registry;
pub mod table;

pub use error::{CoreError, StepFailure};
pub use registry::{BoundSteps, StepArg, StepHandler, StepRegistry, StepRegistryBuilder};
pub use table::Table;
