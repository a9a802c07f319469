//! Shared utilities

pub mod paths;

pub use paths::{normalize, normalize_against};
