//! # stepwire-client
//!
//! Client library for stepwire.
//!
//! This crate provides:
//! - A single persistent TCP connection to the host's API port
//! - Atomic request/response exchanges serialized across concurrent callers
//! - Typed step-value and all-steps operations
//! - Configuration from defaults, YAML files and environment variables

pub mod client;
pub mod config;
pub mod connection;
pub mod error;

pub use client::Client;
pub use config::{ConfigError, ConnectionConfig};
pub use connection::{Connection, MessageIdSource};
pub use error::ClientError;
