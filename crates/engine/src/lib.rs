//! Everyday Heroes advancement engine.
//!
//! ## Structure
//!
//! - `use_cases/` - The advancement workflow and the triggers that start it
//! - `infrastructure/` - Ports plus the in-memory store, scripted flow and
//!   file/settings adapters used by the binary

pub mod infrastructure;
pub mod use_cases;
