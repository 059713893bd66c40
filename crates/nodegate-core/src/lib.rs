//! nodegate-core — shared types for node-local admission control.
//!
//! Defines the machine identity a node agent runs as, the unit
//! descriptors that flow through admission, and the agent's TOML
//! configuration file.

pub mod config;
pub mod types;

pub use config::{AgentConfig, ConfigError, ProbeConfig};
pub use types::*;
