//! Use cases - user story orchestration.

pub mod advancement;
