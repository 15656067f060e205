//! Small pure helpers shared by the domain and the engine.

pub mod string;

pub use string::{slugify, some_if_not_empty};
