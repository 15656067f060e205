//! Infrastructure implementations.
//!
//! Contains port traits and the adapters the binary and tests run against.

pub mod json_files;
pub mod memory_store;
pub mod ports;
pub mod scripted_flow;
pub mod settings;
