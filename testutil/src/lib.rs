/// Testing utilities for the consensus workspace
///
/// Provides test data generators shared across crates.

pub mod generators;

pub use generators::*;
