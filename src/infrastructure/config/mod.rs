//! Configuration loading with hierarchical merging and validation.

pub mod loader;

pub use loader::{ConfigError, ConfigLoader};
