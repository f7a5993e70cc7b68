//! # Archimedes Core
//!
//! Shared utilities for the Archimedes 2D engine: math aliases with the
//! packing bridge used by vertex storage, and optional profiling macros.

pub mod math;
pub mod profiling;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the core library version.
pub fn init() {
    log::info!("Archimedes Core v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
